//! Tool schema validity tests.
//!
//! Every registered tool must carry a description and an object schema whose
//! `required` list only names declared properties.

use serde_json::Value;

/// Validates that a JSON schema has the required structure.
fn validate_json_schema(schema: &Value) -> Result<(), String> {
    let obj = schema
        .as_object()
        .ok_or_else(|| "Schema must be an object".to_string())?;

    if let Some(type_val) = obj.get("type") {
        if type_val != "object" {
            return Err(format!("Expected type 'object', got {:?}", type_val));
        }
    }

    let properties = match obj.get("properties") {
        Some(Value::Object(props)) => props,
        Some(_) => return Err("Properties must be an object".to_string()),
        None => return Err("Schema must declare properties".to_string()),
    };

    if let Some(required) = obj.get("required") {
        let required = required
            .as_array()
            .ok_or_else(|| "Required must be an array".to_string())?;
        for name in required {
            let name = name.as_str().ok_or_else(|| "Required entries must be strings".to_string())?;
            if !properties.contains_key(name) {
                return Err(format!("Required field '{}' is not a declared property", name));
            }
        }
    }

    Ok(())
}

/// Validates that a tool has required fields.
fn validate_tool(tool: &rmcp::model::Tool) -> Result<(), String> {
    if tool.name.is_empty() {
        return Err("Tool name cannot be empty".to_string());
    }

    match tool.description.as_deref() {
        Some(d) if !d.is_empty() => {}
        _ => return Err(format!("Tool '{}' must have a description", tool.name)),
    }

    let schema_value = serde_json::to_value(&*tool.input_schema)
        .map_err(|e| format!("Failed to serialize schema: {}", e))?;
    validate_json_schema(&schema_value)
}

/// Every tool of every server.
fn all_tools() -> Vec<rmcp::model::Tool> {
    let mut tools = dental_mcp_speech::server::tool_definitions();
    tools.extend(dental_mcp_calendar::server::tool_definitions());
    tools
}

fn required_fields(tool: &rmcp::model::Tool) -> Vec<String> {
    tool.input_schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(|n| n.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dental_mcp_calendar::CalendarServer;
    use dental_mcp_common::CalendarConfig;
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_json_schema_validation() {
        let valid = json!({
            "type": "object",
            "properties": {"date": {"type": "string"}},
            "required": ["date"]
        });
        assert!(validate_json_schema(&valid).is_ok());

        let dangling = json!({
            "type": "object",
            "properties": {},
            "required": ["date"]
        });
        assert!(validate_json_schema(&dangling).is_err());

        assert!(validate_json_schema(&json!({"type": "string"})).is_err());
    }

    #[test]
    fn test_all_tools_are_valid() {
        for tool in all_tools() {
            validate_tool(&tool).unwrap_or_else(|e| panic!("{}", e));
        }
    }

    #[test]
    fn test_tool_names_are_unique() {
        let tools = all_tools();
        let names: HashSet<&str> = tools.iter().map(|t| t.name.as_ref()).collect();
        assert_eq!(names.len(), tools.len());
        assert_eq!(tools.len(), 7);
    }

    fn full_arguments(tool: &str) -> Value {
        match tool {
            "check_available_slots" => json!({"date": "2025-03-04"}),
            "book_appointment" => json!({
                "patient_name": "Jan",
                "patient_email": "jan@example.com",
                "date": "2025-03-04",
                "time": "10:00",
                "appointment_type": "controle"
            }),
            "list_appointments" => json!({"start_date": "2025-03-03", "end_date": "2025-03-05"}),
            "get_appointment_details" => json!({"event_id": "e1"}),
            "cancel_appointment" => json!({"event_id": "e1"}),
            "reschedule_appointment" => {
                json!({"event_id": "e1", "new_date": "2025-03-05", "new_time": "14:00"})
            }
            other => panic!("no arguments for {}", other),
        }
    }

    /// Dropping any required field is rejected before the calendar is touched.
    #[tokio::test]
    async fn test_missing_required_field_is_invalid_params() {
        let server = CalendarServer::new(CalendarConfig::default());

        for tool in dental_mcp_calendar::server::tool_definitions() {
            for field in required_fields(&tool) {
                let mut arguments = full_arguments(&tool.name);
                arguments.as_object_mut().unwrap().remove(&field);

                let err = server
                    .call_tool_json(&tool.name, arguments.as_object().cloned())
                    .await
                    .unwrap_err();
                assert_eq!(
                    err.code,
                    rmcp::model::ErrorCode::INVALID_PARAMS,
                    "{} without {}",
                    tool.name,
                    field
                );
            }
        }
    }

    proptest! {
        /// Arbitrary tool names outside the registry are always rejected.
        #[test]
        fn prop_unknown_tool_rejected(name in "[a-z_]{1,30}") {
            let known: HashSet<String> = all_tools().iter().map(|t| t.name.to_string()).collect();
            prop_assume!(!known.contains(&name));

            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let server = CalendarServer::new(CalendarConfig::default());
            let err = runtime.block_on(server.call_tool_json(&name, None)).unwrap_err();
            prop_assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
        }
    }
}
