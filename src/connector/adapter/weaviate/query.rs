use super::dto::PROPERTY_NAMES;
use crate::domain::MetadataFilter;

/// `Get` query with a `nearVector` argument, rendered as GraphQL text.
#[derive(Debug, Clone)]
pub struct GetNearVectorQuery<'a> {
    pub class: &'a str,
    pub vector: &'a [f32],
    pub limit: usize,
    pub certainty: Option<f64>,
    pub offset: usize,
    pub filter: Option<&'a MetadataFilter>,
    pub with_vector: bool,
}

impl GetNearVectorQuery<'_> {
    pub fn build(&self) -> String {
        let vector = self
            .vector
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let certainty = self
            .certainty
            .map(|c| format!(", certainty: {c}"))
            .unwrap_or_default();
        let filter = self
            .filter
            .map(|f| {
                format!(
                    " where: {{path: [\"sk_{field}\"], operator: Equal, valueText: {value}}}",
                    field = f.field.as_str(),
                    value = serde_json::Value::from(f.value.as_str()),
                )
            })
            .unwrap_or_default();
        let offset = if self.offset > 0 {
            format!(" offset: {}", self.offset)
        } else {
            String::new()
        };
        let additional = if self.with_vector {
            "id certainty vector"
        } else {
            "id certainty"
        };

        format!(
            "{{ Get {{ {class}(nearVector: {{vector: [{vector}]{certainty}}}{filter} limit: {limit}{offset}) {{ {props} _additional {{ {additional} }} }} }} }}",
            class = self.class,
            limit = self.limit,
            props = PROPERTY_NAMES.join(" "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MetadataField;

    #[test]
    fn renders_near_vector_query() {
        let query = GetNearVectorQuery {
            class: "SKNotes",
            vector: &[0.5, -1.0, 0.25],
            limit: 3,
            certainty: Some(0.7),
            offset: 0,
            filter: None,
            with_vector: false,
        }
        .build();

        assert!(query.starts_with("{ Get { SKNotes(nearVector: {vector: [0.5,-1,0.25], certainty: 0.7} limit: 3) {"));
        assert!(query.contains("sk_id sk_key sk_text"));
        assert!(query.ends_with("_additional { id certainty } } } }"));
    }

    #[test]
    fn omits_certainty_and_can_request_vectors() {
        let query = GetNearVectorQuery {
            class: "SKNotes",
            vector: &[1.0],
            limit: 1,
            certainty: None,
            offset: 0,
            filter: None,
            with_vector: true,
        }
        .build();

        assert!(query.contains("nearVector: {vector: [1]} limit: 1"));
        assert!(query.contains("_additional { id certainty vector }"));
    }

    #[test]
    fn renders_where_filter_and_offset() {
        let filter = MetadataFilter::new(MetadataField::Description, "say \"hi\"");
        let query = GetNearVectorQuery {
            class: "SKNotes",
            vector: &[1.0],
            limit: 2,
            certainty: None,
            offset: 6,
            filter: Some(&filter),
            with_vector: false,
        }
        .build();

        assert!(query.contains(
            r#"nearVector: {vector: [1]} where: {path: ["sk_description"], operator: Equal, valueText: "say \"hi\""} limit: 2 offset: 6) {"#
        ));
    }
}
