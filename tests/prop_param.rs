use proptest::prelude::*;
use querymen::value::normalize;
use querymen::{Param, ParamOptions, RawQuery, Schema, Value, ValueType, keys};

proptest! {
    #[test]
    fn prop_integer_text_coerces_to_number(n in any::<i32>()) {
        let mut p = Param::named("n", ParamOptions::new().with(keys::TYPE, ValueType::Number));
        prop_assert_eq!(p.set_value(n.to_string()), Value::from(n));
    }

    #[test]
    fn prop_split_yields_one_element_per_token(tokens in proptest::collection::vec("[a-z]{1,8}", 1..10)) {
        let mut p = Param::named("t", ParamOptions::new().with(keys::MULTIPLE, true));
        let bound = p.set_value(tokens.join(","));
        prop_assert_eq!(bound.as_array().map(<[Value]>::len), Some(tokens.len()));
    }

    #[test]
    fn prop_skip_is_limit_times_previous_pages(page in 1..=30i32, limit in 1..=100i32) {
        let mut schema = Schema::default();
        let parsed = schema.parse(&RawQuery::new().with("page", page).with("limit", limit));
        prop_assert_eq!(parsed.cursor().get_i32("skip").unwrap(), limit * (page - 1));
        prop_assert_eq!(parsed.cursor().get_i32("limit").unwrap(), limit);
    }

    #[test]
    fn prop_normalize_is_idempotent(s in "[A-Za-z0-9 _-]{0,20}") {
        let once = normalize(&s);
        prop_assert_eq!(normalize(&once), once.clone());
        prop_assert!(!once.contains("  "));
        prop_assert_eq!(once.to_lowercase(), once);
    }
}
