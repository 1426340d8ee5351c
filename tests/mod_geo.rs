use bson::{Bson, doc};
use querymen::schema::defaults::EARTH_RADIUS_M;
use querymen::{ParamDef, ParamOptions, RawQuery, Schema, SchemaOptions, Toggle, keys};

fn near_schema(geojson: bool) -> Schema {
    Schema::new(
        [("near", ParamDef::Options(ParamOptions::new().with(keys::GEOJSON, geojson)))],
        SchemaOptions::new().with("near", true),
    )
}

#[test]
fn near_is_disabled_by_default() {
    let schema = Schema::default();
    for name in ["near", "min_distance", "max_distance"] {
        assert!(schema.get(name).is_none(), "{name}");
    }
}

#[test]
fn companions_follow_near() {
    let schema = near_schema(true);
    let names: Vec<&str> = schema.params().map(|p| p.name()).collect();
    assert_eq!(
        names,
        ["q", "fields", "near", "min_distance", "max_distance", "page", "limit", "sort"]
    );
}

#[test]
fn legacy_pair_with_radian_distance() {
    let mut schema = near_schema(false);
    let raw = RawQuery::new().with("near", "-22.0,-44.0").with("max_distance", 56);
    assert!(schema.validate(&raw).is_ok());
    let parsed = schema.parse(&raw);
    assert_eq!(
        parsed.query(),
        &doc! { "location": {
            "$near": [-44.0, -22.0],
            "$maxDistance": 56.0 / EARTH_RADIUS_M,
        } }
    );
    assert!(!parsed.cursor().contains_key("sort"));
    assert_eq!(schema.option("sort"), Some(&Toggle::Enabled(false)));
}

#[test]
fn geojson_point_in_meters() {
    let mut schema = near_schema(true);
    let raw = RawQuery::new()
        .with("near", "-22,-44")
        .with("min_distance", 10)
        .with("max_distance", 500);
    let parsed = schema.parse(&raw);
    assert_eq!(
        parsed.query(),
        &doc! { "location": { "$near": {
            "$geometry": { "type": "Point", "coordinates": [-44.0, -22.0] },
            "$minDistance": 10.0,
            "$maxDistance": 500.0,
        } } }
    );
    let coords = parsed
        .query()
        .get_document("location")
        .and_then(|l| l.get_document("$near"))
        .and_then(|n| n.get_document("$geometry"))
        .and_then(|g| g.get_array("coordinates"))
        .unwrap();
    assert!(coords.iter().all(|c| matches!(c, Bson::Double(_))));
}

#[test]
fn coordinates_are_validated() {
    let mut schema = near_schema(true);
    let err = schema.validate(&RawQuery::new().with("near", "-22")).unwrap_err();
    assert_eq!((err.param.as_str(), err.name.as_str()), ("near", "minlength"));

    let err = schema.validate(&RawQuery::new().with("near", "200,10")).unwrap_err();
    assert_eq!(err.name, "max");

    let err = schema
        .validate(&RawQuery::new().with("near", "1,1").with("min_distance", -1))
        .unwrap_err();
    assert_eq!((err.param.as_str(), err.name.as_str()), ("min_distance", "min"));
}

#[test]
fn absent_near_keeps_sort() {
    let mut schema = near_schema(true);
    let parsed = schema.parse(&RawQuery::new());
    assert!(parsed.query().is_empty());
    assert_eq!(parsed.cursor().get_document("sort").unwrap(), &doc! { "createdAt": -1 });
    assert!(schema.options().is_enabled("sort"));
}

#[test]
fn custom_geo_path() {
    let mut schema = Schema::new(
        [(
            "near",
            ParamDef::Options(ParamOptions::new().with(keys::PATHS, vec!["geo"]).with(keys::MAX_DISTANCE, false)),
        )],
        SchemaOptions::new().with("near", true),
    );
    assert!(schema.get("max_distance").is_none());
    assert!(schema.get("min_distance").is_some());
    let parsed = schema.parse(&RawQuery::new().with("near", "1,2"));
    assert!(parsed.query().contains_key("geo"));
}
