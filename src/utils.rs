//! Request ids: a uuid7 encoded as bech32m under the kind's prefix
//! (`od1…`, `lab1…`, `hos1…`).

use bech32::Bech32m;
use uuid7::uuid7;

pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}
