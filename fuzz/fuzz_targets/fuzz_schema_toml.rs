#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(cfg) = querymen::config::SchemaConfig::from_toml_str(s) {
            let _ = cfg.into_schema().parse(&querymen::RawQuery::new());
        }
    }
});
