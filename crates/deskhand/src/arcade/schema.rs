//! Conversion from Arcade tool definitions to function-calling definitions.
//!
//! Function names may not contain `.`, so `Zendesk.ListTickets` is exposed
//! to the model as `Zendesk_ListTickets`.

use super::{InputParameter, ToolDefinition, ValueSchema};
use crate::ToolDef;
use serde_json::{Map, Value, json};

/// `Toolkit.Tool` → `Toolkit_Tool`.
pub fn to_function_name(qualified_name: &str) -> String {
    qualified_name.replace('.', "_")
}

/// `Toolkit_Tool` → `Toolkit.Tool`. Names already in qualified form are
/// returned unchanged.
pub fn to_qualified_name(name: &str) -> String {
    if name.contains('.') {
        name.to_string()
    } else {
        name.replacen('_', ".", 1)
    }
}

/// Build the function-calling definition for an Arcade tool.
pub fn to_tool_def(def: &ToolDefinition) -> ToolDef {
    ToolDef::new(
        to_function_name(&def.qualified_name()),
        def.description.clone(),
        parameters_schema(&def.input.parameters),
    )
}

/// JSON Schema object for a tool's input parameters.
pub fn parameters_schema(params: &[InputParameter]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in params {
        let mut schema = value_schema(&param.value_schema);
        if let (Some(description), Value::Object(obj)) = (&param.description, &mut schema) {
            obj.insert("description".into(), Value::String(description.clone()));
        }
        properties.insert(param.name.clone(), schema);
        if param.required {
            required.push(Value::String(param.name.clone()));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn value_schema(schema: &ValueSchema) -> Value {
    let mut out = match schema.val_type.as_str() {
        "array" => {
            let inner = schema.inner_val_type.as_deref().unwrap_or("string");
            json!({ "type": "array", "items": { "type": json_type(inner) } })
        }
        other => json!({ "type": json_type(other) }),
    };
    if let (Some(values), Value::Object(obj)) = (&schema.enum_values, &mut out) {
        obj.insert("enum".into(), json!(values));
    }
    out
}

fn json_type(val_type: &str) -> &str {
    match val_type {
        "json" => "object",
        "integer" | "number" | "boolean" | "string" | "array" => val_type,
        _ => "string",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, val_type: &str, required: bool) -> InputParameter {
        InputParameter {
            name: name.into(),
            required,
            description: Some(format!("the {name}")),
            value_schema: ValueSchema {
                val_type: val_type.into(),
                inner_val_type: None,
                enum_values: None,
            },
            inferrable: true,
        }
    }

    #[test]
    fn name_mapping() {
        assert_eq!(to_function_name("Zendesk.ListTickets"), "Zendesk_ListTickets");
        assert_eq!(to_qualified_name("Zendesk_ListTickets"), "Zendesk.ListTickets");
        assert_eq!(to_qualified_name("Zendesk_Add_Comment"), "Zendesk.Add_Comment");
        assert_eq!(to_qualified_name("Zendesk.ListTickets"), "Zendesk.ListTickets");
    }

    #[test]
    fn builds_object_schema_with_required_fields() {
        let schema = parameters_schema(&[
            param("ticket_id", "integer", true),
            param("body", "string", true),
            param("public", "boolean", false),
            param("metadata", "json", false),
        ]);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["ticket_id"]["type"], "integer");
        assert_eq!(schema["properties"]["metadata"]["type"], "object");
        assert_eq!(schema["properties"]["body"]["description"], "the body");
        assert_eq!(schema["required"], json!(["ticket_id", "body"]));
    }

    #[test]
    fn arrays_and_enums() {
        let mut tags = param("tags", "array", false);
        tags.value_schema.inner_val_type = Some("string".into());
        let mut status = param("status", "string", false);
        status.value_schema.enum_values = Some(vec!["open".into(), "solved".into()]);

        let schema = parameters_schema(&[tags, status]);
        assert_eq!(
            schema["properties"]["tags"],
            json!({ "type": "array", "items": { "type": "string" }, "description": "the tags" })
        );
        assert_eq!(schema["properties"]["status"]["enum"], json!(["open", "solved"]));
    }

    #[test]
    fn empty_parameters_still_form_an_object() {
        assert_eq!(
            parameters_schema(&[]),
            json!({ "type": "object", "properties": {}, "required": [] })
        );
    }
}
