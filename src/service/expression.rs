//! Earth Engine expression graphs.
//!
//! Queries are sent to `value:compute` as a graph of function invocations.
//! Each node is either a constant or a call of a named server-side algorithm
//! with named arguments.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// One node of an expression graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueNode {
    ConstantValue(Value),
    #[serde(rename_all = "camelCase")]
    FunctionInvocationValue {
        function_name: String,
        arguments: BTreeMap<String, ValueNode>,
    },
}

/// A complete expression: named nodes plus the id of the result node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expression {
    pub result: String,
    pub values: BTreeMap<String, ValueNode>,
}

impl Expression {
    pub fn new(root: ValueNode) -> Self {
        let mut values = BTreeMap::new();
        values.insert("0".to_string(), root);
        Self {
            result: "0".to_string(),
            values,
        }
    }
}

pub fn constant(value: impl Into<Value>) -> ValueNode {
    ValueNode::ConstantValue(value.into())
}

pub fn invoke<const N: usize>(name: &str, arguments: [(&str, ValueNode); N]) -> ValueNode {
    ValueNode::FunctionInvocationValue {
        function_name: name.to_string(),
        arguments: arguments
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    }
}

pub fn load_collection(id: &str) -> ValueNode {
    invoke("ImageCollection.load", [("id", constant(id))])
}

pub fn date(day: NaiveDate) -> ValueNode {
    invoke(
        "Date",
        [("value", constant(day.format("%Y-%m-%d").to_string()))],
    )
}

/// Keep images whose `system:time_start` lies in `[start, end)`.
pub fn filter_date(collection: ValueNode, start: NaiveDate, end: NaiveDate) -> ValueNode {
    let range = invoke("DateRange", [("start", date(start)), ("end", date(end))]);
    let filter = invoke(
        "Filter.dateRangeContains",
        [
            ("leftValue", range),
            ("rightField", constant("system:time_start")),
        ],
    );
    invoke(
        "Collection.filter",
        [("collection", collection), ("filter", filter)],
    )
}

/// Keep images whose `property` is strictly below `value`.
pub fn filter_less_than(collection: ValueNode, property: &str, value: f64) -> ValueNode {
    let filter = invoke(
        "Filter.lessThan",
        [("leftField", constant(property)), ("rightValue", constant(value))],
    );
    invoke(
        "Collection.filter",
        [("collection", collection), ("filter", filter)],
    )
}

pub fn size(collection: ValueNode) -> ValueNode {
    invoke("Collection.size", [("collection", collection)])
}

pub fn point(lon: f64, lat: f64) -> ValueNode {
    invoke(
        "GeometryConstructors.Point",
        [("coordinates", constant(json!([lon, lat])))],
    )
}

/// Per-pixel values of every image intersecting `geometry` at `scale` meters.
pub fn get_region(collection: ValueNode, geometry: ValueNode, scale: f64) -> ValueNode {
    invoke(
        "ImageCollection.getRegion",
        [
            ("collection", collection),
            ("geometry", geometry),
            ("scale", constant(scale)),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_constant_wire_shape() {
        let node = constant("COPERNICUS/S2_SR_HARMONIZED");
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"constantValue": "COPERNICUS/S2_SR_HARMONIZED"})
        );
    }

    #[test]
    fn test_invocation_wire_shape() {
        let node = load_collection("COPERNICUS/S2_SR_HARMONIZED");
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({
                "functionInvocationValue": {
                    "functionName": "ImageCollection.load",
                    "arguments": {"id": {"constantValue": "COPERNICUS/S2_SR_HARMONIZED"}}
                }
            })
        );
    }

    #[test]
    fn test_filter_date_is_half_open_range() {
        let node = filter_date(load_collection("C"), day("2024-01-01"), day("2024-01-16"));
        let v = serde_json::to_value(&node).unwrap();

        let filter = &v["functionInvocationValue"]["arguments"]["filter"]["functionInvocationValue"];
        assert_eq!(filter["functionName"], "Filter.dateRangeContains");
        assert_eq!(filter["arguments"]["rightField"]["constantValue"], "system:time_start");

        let range = &filter["arguments"]["leftValue"]["functionInvocationValue"];
        assert_eq!(range["functionName"], "DateRange");
        assert_eq!(
            range["arguments"]["end"]["functionInvocationValue"]["arguments"]["value"]
                ["constantValue"],
            "2024-01-16"
        );
    }

    #[test]
    fn test_expression_envelope() {
        let expr = Expression::new(size(load_collection("C")));
        let v = serde_json::to_value(&expr).unwrap();

        assert_eq!(v["result"], "0");
        assert_eq!(
            v["values"]["0"]["functionInvocationValue"]["functionName"],
            "Collection.size"
        );
    }

    #[test]
    fn test_point_and_region() {
        let node = get_region(load_collection("C"), point(12.5, 41.9), 10.0);
        let v = serde_json::to_value(&node).unwrap();
        let args = &v["functionInvocationValue"]["arguments"];

        assert_eq!(args["scale"]["constantValue"], 10.0);
        assert_eq!(
            args["geometry"]["functionInvocationValue"]["arguments"]["coordinates"]
                ["constantValue"],
            json!([12.5, 41.9])
        );
    }
}
