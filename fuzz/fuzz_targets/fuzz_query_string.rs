#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        // Parsing arbitrary query strings must not panic
        let mw = querymen::Middleware::default();
        let _ = mw.handle_query_string(s);
        let mut schema = querymen::Schema::new(
            [("near", querymen::ParamDef::from(querymen::ParamOptions::new()))],
            querymen::SchemaOptions::new().with("near", true),
        );
        let _ = schema.parse(&querymen::RawQuery::parse(s));
    }
});
