use bson::{Bson, Document};

/// Deep-merges `src` into `dst`.
///
/// Nested documents merge key by key and anything else is overwritten, except that two
/// top-level `$or` disjunctions are both kept under `$and`.
pub fn merge_into(dst: &mut Document, src: Document) {
    for (key, value) in src {
        if key == "$or" && dst.contains_key("$or") {
            let previous = dst.remove("$or").unwrap_or(Bson::Null);
            let mut all = match dst.remove("$and") {
                Some(Bson::Array(items)) => items,
                Some(other) => vec![other],
                None => Vec::new(),
            };
            let mut left = Document::new();
            left.insert("$or", previous);
            let mut right = Document::new();
            right.insert("$or", value);
            all.push(Bson::Document(left));
            all.push(Bson::Document(right));
            dst.insert("$and", all);
            continue;
        }
        assign(dst, key, value);
    }
}

fn assign(dst: &mut Document, key: String, value: Bson) {
    match value {
        Bson::Document(incoming) => match dst.get_mut(&key) {
            Some(Bson::Document(existing)) => {
                for (k, v) in incoming {
                    assign(existing, k, v);
                }
            }
            _ => {
                dst.insert(key, incoming);
            }
        },
        value => {
            dst.insert(key, value);
        }
    }
}
