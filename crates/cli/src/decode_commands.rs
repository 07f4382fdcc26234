use std::{io::Read, path::Path};

use {anyhow::Result, teamwire_activity::ActivityCodec};

/// Decode an activity from `path` (or stdin for `-`) and print the shape it
/// resolved to followed by its canonical encoding.
pub fn decode(path: &Path) -> Result<()> {
    let raw = if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?
    };

    let (shape, encoded) = describe(&ActivityCodec::default(), &raw)?;
    eprintln!("{shape}");
    println!("{encoded}");
    Ok(())
}

fn describe(codec: &ActivityCodec, raw: &[u8]) -> Result<(&'static str, String)> {
    let activity = codec.decode(raw)?;
    let encoded = serde_json::to_string_pretty(&codec.encode_value(&activity))?;
    Ok((activity.type_name(), encoded))
}
