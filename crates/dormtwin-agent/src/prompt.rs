//! System framing for the planner.
//!
//! The framing describes the two stores and lists the registered tools. Tool
//! semantics themselves live in the tool catalogue sent with every call.

use crate::registry::{ToolKind, ToolRegistry};

/// Default framing; `{tools}` is replaced by the registered tool list.
const DEFAULT_FRAMING: &str = r#"You answer questions about a dormitory building by querying its digital twin.

You can only learn facts by calling tools. Do not write tool calls as text; use function calling.

Stores:
- Building graph (Neo4j). Nodes: Room {room_number, room_type: "dorm" | "mechanical"}, ACUnit {unit_id}, TemperatureSensor {sensor_id}, OccupancySensor {sensor_id}. Relationships: (ACUnit)-[:SERVICES]->(Room), (ACUnit)-[:LOCATED_IN]->(Room), (sensor)-[:INSTALLED_IN]->(Room). room_number is a string.
- Sensor history (InfluxDB 3, SQL). Table sensor_readings with columns time, sensor_id, sensor_type ('temperature' | 'occupancy'), reading. It knows sensor ids only, not rooms.

Approach:
1. Resolve rooms and equipment to sensor ids in the graph first; never guess an id.
2. Then read values from sensor_readings filtered by sensor_id. Use standard SQL aggregates (AVG, MAX, MIN) and DATE_BIN for buckets.
3. Both stores are read-only. Write statements are rejected before they run.
4. If a query fails or returns nothing, adjust it once; if it still fails, say what is missing.
5. Answer from tool output only, name the store the evidence came from, and use Celsius for temperatures.

Tools:
{tools}"#;

/// Build the system framing for a registry.
pub fn build_system_framing(registry: &ToolRegistry) -> String {
    let tools: Vec<String> = registry
        .kinds()
        .map(|k| format!("- {}: {}", k.name(), tool_summary(k)))
        .collect();
    let tools = if tools.is_empty() {
        "(none registered)".to_string()
    } else {
        tools.join("\n")
    };
    DEFAULT_FRAMING.replace("{tools}", &tools)
}

fn tool_summary(kind: ToolKind) -> &'static str {
    match kind {
        ToolKind::QueryGraph => "read-only Cypher over the building graph",
        ToolKind::QuerySeries => "read-only SQL SELECT over sensor_readings",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framing_lists_registered_tools_only() {
        let framing = build_system_framing(&ToolRegistry::default());
        assert!(framing.contains("(none registered)"));
        assert!(!framing.contains("{tools}"));
    }
}
