use bson::{Bson, Document, doc};
use querymen::{OptionValue, Param, ParamOptions, QueryError, Value, ValueType, keys};

fn typed(ty: ValueType) -> Param {
    Param::named("x", ParamOptions::new().with(keys::TYPE, ty))
}

#[test]
fn scalar_coercion() {
    let mut p = typed(ValueType::Number);
    assert_eq!(p.set_value("23"), Value::from(23));
    assert_eq!(p.set_value(" 1.5 "), Value::from(1.5));
    assert!(p.set_value("abc").is_nan());

    let mut p = typed(ValueType::Boolean);
    assert_eq!(p.set_value("1"), Value::from(true));
    assert_eq!(p.set_value("yes"), Value::from(true));
    for falsy in ["false", "0", ""] {
        assert_eq!(p.set_value(falsy), Value::from(false), "{falsy:?}");
    }

    let mut p = typed(ValueType::String);
    assert_eq!(p.set_value(23), Value::from("23"));
}

#[test]
fn date_coercion() {
    let mut p = typed(ValueType::Date);
    let Value::Date(d) = p.set_value("1500000000000") else { panic!("expected a date") };
    assert_eq!(d.timestamp_millis(), 1_500_000_000_000);
    let Value::Date(d) = p.set_value("2016-04-24") else { panic!("expected a date") };
    assert_eq!(d.to_rfc3339(), "2016-04-24T00:00:00+00:00");
    assert_eq!(p.set_value("not a date"), Value::InvalidDate);
    assert_eq!(p.parse(), doc! { "x": Bson::Null });
}

#[test]
fn regex_type_builds_case_insensitive_pattern() {
    let mut p = typed(ValueType::Regex);
    p.set_value("Abc");
    assert_eq!(p.parse(), doc! { "x": { "$regex": "Abc", "$options": "i" } });
}

#[test]
fn custom_type_casts_non_nil_values() {
    let mut p = typed(ValueType::custom(|v| Value::from(format!("<{}>", v.to_text()))));
    assert_eq!(p.set_value("a"), Value::from("<a>"));
    assert_eq!(p.set_value(Value::Null), Value::Null);
}

#[test]
fn multiple_splits_once_and_formats_each_element() {
    let mut p = Param::named(
        "tags",
        ParamOptions::new().with(keys::MULTIPLE, true).with(keys::UPPERCASE, true),
    );
    assert_eq!(p.set_value(" a ,b,c"), Value::from(vec!["A", "B", "C"]));
    assert_eq!(p.value(), Value::from(vec!["A", "B", "C"]));
    assert_eq!(p.value(), p.value());

    // unseparated strings and scalars become singletons
    assert_eq!(p.set_value("solo"), Value::from(vec!["SOLO"]));
    assert_eq!(p.set_value(vec!["x", "y"]), Value::from(vec!["X", "Y"]));
}

#[test]
fn type_list_and_custom_separator() {
    let mut p = Param::named(
        "ids",
        ParamOptions::new()
            .with(keys::TYPE, OptionValue::TypeList(ValueType::Number))
            .with(keys::SEPARATOR, "|"),
    );
    assert!(p.is_multiple());
    assert_eq!(p.set_value("1|2|3"), Value::from(vec![1, 2, 3]));
    assert_eq!(p.parse(), doc! { "ids": { "$in": [1, 2, 3] } });
}

#[test]
fn equality_round_trip() {
    let p = Param::new("name", "John", ParamOptions::new());
    assert_eq!(p.parse(), doc! { "name": "John" });
    let mut q = p.clone();
    let v = q.value();
    assert_eq!(q.parse_value(v), doc! { "name": "John" });
}

#[test]
fn operators_and_sequence_promotion() {
    let p = Param::new("age", 30, ParamOptions::new().with(keys::OPERATOR, "$gte"));
    assert_eq!(p.parse(), doc! { "age": { "$gte": 30 } });

    let p = Param::new("tag", vec!["a", "b"], ParamOptions::new());
    assert_eq!(p.parse(), doc! { "tag": { "$in": ["a", "b"] } });

    let p = Param::new("tag", vec!["a", "b"], ParamOptions::new().with(keys::OPERATOR, "$ne"));
    assert_eq!(p.parse(), doc! { "tag": { "$nin": ["a", "b"] } });

    let p = Param::new("tag", "a", ParamOptions::new().with(keys::OPERATOR, "$ne"));
    assert_eq!(p.parse(), doc! { "tag": { "$ne": "a" } });
}

#[test]
fn nil_value_contributes_nothing() {
    let p = Param::named("x", ParamOptions::new());
    assert!(p.parse().is_empty());
}

#[test]
fn multiple_paths_become_disjunction() {
    let p = Param::new("term", "x", ParamOptions::new().with(keys::PATHS, vec!["title", "body"]));
    assert_eq!(p.parse(), doc! { "$or": [{ "title": "x" }, { "body": "x" }] });
}

#[test]
fn default_is_applied_before_normalize() {
    let p = Param::named(
        "x",
        ParamOptions::new().with(keys::DEFAULT, "Bé Test").with(keys::NORMALIZE, true),
    );
    assert_eq!(p.value(), Value::from("be test"));
}

#[test]
fn list_default_is_formatted_once() {
    let bang = |opt: &OptionValue, v: Value, _: &Param| match v {
        Value::String(s) if opt.is_truthy() => Value::String(format!("{s}!")),
        other => other,
    };
    let mut list = Param::named(
        "l",
        ParamOptions::new()
            .with(keys::TYPE, OptionValue::TypeList(ValueType::String))
            .with(keys::DEFAULT, "a")
            .with("bang", true),
    );
    list.set_formatter("bang", bang).unwrap();
    let mut scalar = Param::named("s", ParamOptions::new().with(keys::DEFAULT, "a").with("bang", true));
    scalar.set_formatter("bang", bang).unwrap();

    assert_eq!(scalar.set_value(Value::Null), Value::from("a!"));
    assert_eq!(list.set_value(Value::Null), Value::from(vec!["a!"]));
    assert_eq!(list.set_value("x,y"), Value::from(vec!["x!", "y!"]));
}

#[test]
fn computed_default_sees_the_param() {
    let p = Param::named(
        "who",
        ParamOptions::new().with(keys::DEFAULT, OptionValue::default_fn(|p| Value::from(p.name()))),
    );
    assert_eq!(p.value(), Value::from("who"));
}

#[test]
fn numeric_bounds_hold_at_the_boundary() {
    let p = Param::named(
        "n",
        ParamOptions::new().with(keys::TYPE, ValueType::Number).with(keys::MIN, 10).with(keys::MAX, 20),
    );
    assert!(p.validate_value(10).is_ok());
    assert!(p.validate_value(20).is_ok());
    assert_eq!(p.validate_value(9).unwrap_err().name, "min");
    assert_eq!(p.validate_value(21).unwrap_err().name, "max");
    assert!(p.validate_value(Value::Null).is_ok());
}

#[test]
fn length_bounds_hold_at_the_boundary() {
    let p = Param::named("s", ParamOptions::new().with(keys::MINLENGTH, 2).with(keys::MAXLENGTH, 3));
    assert!(p.validate_value("ab").is_ok());
    assert!(p.validate_value("abc").is_ok());
    assert_eq!(p.validate_value("a").unwrap_err().name, "minlength");
    assert_eq!(p.validate_value("abcd").unwrap_err().name, "maxlength");
}

#[test]
fn length_bounds_apply_to_the_collection() {
    let p = Param::named(
        "tags",
        ParamOptions::new().with(keys::MULTIPLE, true).with(keys::MINLENGTH, 2).with(keys::MAXLENGTH, 2),
    );
    assert!(p.validate_value("averylongtag,another").is_ok());
    assert_eq!(p.validate_value("a").unwrap_err().name, "minlength");
    assert_eq!(p.validate_value("a,b,c").unwrap_err().name, "maxlength");
}

#[test]
fn element_failure_is_reported_for_the_whole_param() {
    let p = Param::named(
        "color",
        ParamOptions::new().with(keys::MULTIPLE, true).with(keys::ENUM, vec!["red", "blue"]),
    );
    assert!(p.validate_value("red,blue").is_ok());
    let err = p.validate_value("red,green").unwrap_err();
    assert_eq!(err.name, "enum");
    assert_eq!(err.param, "color");
    assert_eq!(err.value, Value::from("green"));
    assert_eq!(err.message, "color must be one of: red, blue");
}

#[test]
fn first_failure_in_declaration_order_wins() {
    let p = Param::new(
        "n",
        7,
        ParamOptions::new().with(keys::MIN, 10).with(keys::MAX, 5),
    );
    assert_eq!(p.validate().unwrap_err().name, "min");

    let p = Param::new(
        "n",
        7,
        ParamOptions::new().with(keys::MAX, 5).with(keys::MIN, 10),
    );
    assert_eq!(p.validate().unwrap_err().name, "max");
}

#[test]
fn required_rejects_blank_values() {
    let p = Param::named("r", ParamOptions::new().with(keys::REQUIRED, true));
    let err = p.validate().unwrap_err();
    assert_eq!(err.name, "required");
    assert_eq!(err.message, "r is required");
    assert!(p.validate_value("x").is_ok());
    assert!(!p.is_valid());
}

#[test]
fn match_uses_the_configured_pattern() {
    let pattern = querymen::Pattern::new("^[a-z]+$", false).unwrap();
    let p = Param::named("slug", ParamOptions::new().with(keys::MATCH, pattern));
    assert!(p.validate_value("abc").is_ok());
    let err = p.validate_value("ABC").unwrap_err();
    assert_eq!(err.name, "match");
    assert_eq!(err.option, Value::Regex(querymen::Pattern::new("^[a-z]+$", false).unwrap()));
}

#[test]
fn validation_error_serializes_the_option_under_its_name() {
    let p = Param::named("n", ParamOptions::new().with(keys::TYPE, ValueType::Number).with(keys::MIN, 10));
    let err = p.validate_value(3).unwrap_err();
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["valid"], false);
    assert_eq!(json["name"], "min");
    assert_eq!(json["param"], "n");
    assert_eq!(json["value"], 3);
    assert_eq!(json["min"], 10);
    assert_eq!(json["message"], "n must be greater than or equal to 10");
}

#[test]
fn custom_formatter_runs_when_its_option_is_set() {
    let mut p = Param::named("x", ParamOptions::new());
    p.set_formatter("scream", |opt, v, _| match v {
        Value::String(s) if opt.is_truthy() => Value::String(format!("{}!", s.to_uppercase())),
        other => other,
    })
    .unwrap();
    assert_eq!(p.set_value("hi"), Value::from("hi"));
    p.set_option("scream", true);
    assert_eq!(p.set_value("hi"), Value::from("HI!"));
}

#[test]
fn custom_parser_last_one_wins() {
    let mut p = Param::new("products", "x", ParamOptions::new());
    p.set_parser("elemMatch", |opt, value, path, op, _, _| {
        let mut cmp = Document::new();
        cmp.insert(op, value.to_bson());
        let mut inner = Document::new();
        inner.insert(opt.as_str().unwrap_or("name"), cmp);
        let mut query = Document::new();
        query.insert(path, doc! { "$elemMatch": inner });
        query
    })
    .unwrap();
    p.set_option("elemMatch", "name");
    assert_eq!(p.parse(), doc! { "products": { "$elemMatch": { "name": { "$eq": "x" } } } });

    p.set_option(
        keys::PARSE,
        OptionValue::parse(|_, path, _, _, _| {
            let mut query = Document::new();
            query.insert(path, "overridden");
            query
        }),
    );
    assert_eq!(p.parse(), doc! { "products": "overridden" });
}

#[test]
fn handler_names_are_validated() {
    let mut p = Param::named("x", ParamOptions::new());
    let err = p.set_formatter("type", |_, v, _| v).unwrap_err();
    assert!(matches!(err, QueryError::InvalidHandlerName(_)));
    assert!(p.set_validator("__proto__.polluted", |_, _, _, _| querymen::Validation::ok()).is_err());
    for field in ["valid", "name", "param", "value", "message"] {
        let err = p.set_validator(field, |_, _, _, _| querymen::Validation::ok()).unwrap_err();
        assert!(matches!(err, QueryError::InvalidHandlerName(_)), "{field}");
    }
}

#[test]
fn set_and_get_hooks() {
    let mut p = Param::named(
        "x",
        ParamOptions::new()
            .with(keys::SET, OptionValue::hook(|v, _| Value::from(format!("[{}]", v.to_text()))))
            .with(keys::GET, OptionValue::hook(|v, _| Value::from(v.to_text().len() as i64))),
    );
    p.set_value("abc");
    assert_eq!(p.bound(), &Value::from("[abc]"));
    assert_eq!(p.value(), Value::from(5));
}

#[test]
fn reset_rebinds_construction_value() {
    let mut p = Param::new("page", 1, ParamOptions::new());
    p.set_value(4);
    assert_eq!(p.value(), Value::from(4));
    p.reset();
    assert_eq!(p.value(), Value::from(1));
}
