// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// Call registry
//
// The closed set of UI calls the model may request, their argument
// schemas, and the tool definitions advertised to the provider.

use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Call names
// ---------------------------------------------------------------------------

/// A call the dispatcher knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallName {
    RequestOttServiceList,
    RequestOxCarouselButtons,
    RequestCarouselButtons,
    SearchPlans,
    ShowPlanLists,
    RequestTextCard,
    ShowFirstCardList,
}

impl CallName {
    pub const ALL: [CallName; 7] = [
        CallName::RequestOttServiceList,
        CallName::RequestOxCarouselButtons,
        CallName::RequestCarouselButtons,
        CallName::SearchPlans,
        CallName::ShowPlanLists,
        CallName::RequestTextCard,
        CallName::ShowFirstCardList,
    ];

    /// The wire name the model uses.
    pub fn as_str(self) -> &'static str {
        match self {
            CallName::RequestOttServiceList => "requestOTTServiceList",
            CallName::RequestOxCarouselButtons => "requestOXCarouselButtons",
            CallName::RequestCarouselButtons => "requestCarouselButtons",
            CallName::SearchPlans => "searchPlans",
            CallName::ShowPlanLists => "showPlanLists",
            CallName::RequestTextCard => "requestTextCard",
            CallName::ShowFirstCardList => "showFirstCardList",
        }
    }

    /// Exact, case-sensitive lookup.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|call| call.as_str() == name)
    }

    pub fn spec(self) -> &'static CallSpec {
        match self {
            CallName::RequestOttServiceList => &OTT_SERVICE_LIST,
            CallName::RequestOxCarouselButtons => &OX_CAROUSEL_BUTTONS,
            CallName::RequestCarouselButtons => &CAROUSEL_BUTTONS,
            CallName::SearchPlans => &SEARCH_PLANS,
            CallName::ShowPlanLists => &SHOW_PLAN_LISTS,
            CallName::RequestTextCard => &TEXT_CARD,
            CallName::ShowFirstCardList => &FIRST_CARD_LIST,
        }
    }
}

impl fmt::Display for CallName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown call `{0}`")]
pub struct UnknownCallName(pub String);

impl FromStr for CallName {
    type Err = UnknownCallName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownCallName(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Schemas
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldKind {
    pub fn json_type(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Array => "array",
            FieldKind::Object => "object",
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Array => value.is_array(),
            FieldKind::Object => value.is_object(),
        }
    }
}

#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub description: &'static str,
    /// Element schema for arrays of objects; empty otherwise.
    pub items: &'static [FieldSpec],
}

impl FieldSpec {
    const fn new(name: &'static str, kind: FieldKind, required: bool, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required,
            description,
            items: &[],
        }
    }

    const fn array_of(name: &'static str, description: &'static str, items: &'static [FieldSpec]) -> Self {
        Self {
            name,
            kind: FieldKind::Array,
            required: true,
            description,
            items,
        }
    }

    fn json_schema(&self) -> Value {
        let mut schema = json!({
            "type": self.kind.json_type(),
            "description": self.description,
        });
        if !self.items.is_empty() {
            schema["items"] = object_schema(self.items);
        }
        schema
    }
}

#[derive(Debug)]
pub struct CallSpec {
    pub name: CallName,
    pub description: &'static str,
    pub fields: &'static [FieldSpec],
}

/// Outcome of checking arguments against a call's schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    pub missing: Vec<&'static str>,
    pub mismatched: Vec<&'static str>,
}

impl Validation {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty() && self.mismatched.is_empty()
    }
}

impl CallSpec {
    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }

    /// A field counts as absent when missing, null, or an empty string.
    /// Present values of the wrong kind are reported as mismatched.
    pub fn validate(&self, args: &Map<String, Value>) -> Validation {
        let mut validation = Validation::default();
        for field in self.fields {
            match args.get(field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        validation.missing.push(field.name);
                    }
                }
                Some(Value::String(s)) if s.is_empty() => {
                    if field.required {
                        validation.missing.push(field.name);
                    }
                }
                Some(value) if !field.kind.matches(value) => validation.mismatched.push(field.name),
                Some(_) => {}
            }
        }
        validation
    }

    /// OpenAI-style `{"type":"function","function":{...}}` definition.
    pub fn tool_definition(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name.as_str(),
                "description": self.description,
                "parameters": object_schema(self.fields),
            }
        })
    }
}

fn object_schema(fields: &[FieldSpec]) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|f| (f.name.to_string(), f.json_schema()))
        .collect();
    let required: Vec<&str> = fields.iter().filter(|f| f.required).map(|f| f.name).collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Schema lookup by wire name.
pub fn describe(name: &str) -> Option<&'static CallSpec> {
    CallName::parse(name).map(CallName::spec)
}

pub fn validate(name: CallName, args: &Map<String, Value>) -> Validation {
    name.spec().validate(args)
}

/// Tool definitions for every registered call, in registry order.
pub fn tool_definitions() -> Vec<Value> {
    CallName::ALL.iter().map(|c| c.spec().tool_definition()).collect()
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

use FieldKind::{Boolean, Number, String as Str};

static OTT_SERVICE_LIST: CallSpec = CallSpec {
    name: CallName::RequestOttServiceList,
    description: "Ask the user which streaming (OTT) services they use, shown as selectable options.",
    fields: &[],
};

static OX_CAROUSEL_BUTTONS: CallSpec = CallSpec {
    name: CallName::RequestOxCarouselButtons,
    description: "Ask the user a yes/no question, shown as two buttons.",
    fields: &[],
};

static CAROUSEL_ITEM: [FieldSpec; 2] = [
    FieldSpec::new("id", Str, true, "Stable identifier for the option."),
    FieldSpec::new("label", Str, true, "Text shown on the button."),
];

static CAROUSEL_BUTTONS: CallSpec = CallSpec {
    name: CallName::RequestCarouselButtons,
    description: "Offer the user a set of options as carousel buttons.",
    fields: &[FieldSpec::array_of("items", "Options to display.", &CAROUSEL_ITEM)],
};

static SEARCH_PLANS: CallSpec = CallSpec {
    name: CallName::SearchPlans,
    description: "Search the plan catalog. Every provided filter must match the plan exactly.",
    fields: &[
        FieldSpec::new("category", Str, false, "Plan category, for example 5G or LTE."),
        FieldSpec::new("ageGroup", Str, false, "Target age group of the plan."),
        FieldSpec::new("isPopular", Boolean, false, "Only popular plans when true."),
        FieldSpec::new("dataGb", Number, false, "Monthly data in GB; -1 means unlimited."),
        FieldSpec::new("voiceMinutes", Number, false, "Voice minutes; -1 means unlimited."),
    ],
};

static PLAN_ITEM: [FieldSpec; 18] = [
    FieldSpec::new("_id", Str, true, "Plan identifier."),
    FieldSpec::new("category", Str, true, "Plan category."),
    FieldSpec::new("name", Str, true, "Plan name."),
    FieldSpec::new("description", Str, true, "Short plan description."),
    FieldSpec::new("isPopular", Boolean, true, "Whether the plan is popular."),
    FieldSpec::new("dataGb", Number, true, "Monthly data in GB; -1 means unlimited."),
    FieldSpec::new("sharedDataGb", Number, true, "Tethering/shared data in GB."),
    FieldSpec::new("voiceMinutes", Number, true, "Voice minutes; -1 means unlimited."),
    FieldSpec::new("addonVoiceMinutes", Number, true, "Additional voice minutes."),
    FieldSpec::new("smsCount", Number, true, "SMS count; -1 means unlimited."),
    FieldSpec::new("monthlyFee", Number, true, "Monthly fee."),
    FieldSpec::new("optionalDiscountAmount", Number, true, "Discount with optional contract."),
    FieldSpec::new("ageGroup", Str, true, "Target age group."),
    FieldSpec::new("detailUrl", Str, true, "Link to the plan detail page."),
    FieldSpec::new("bundleBenefit", Str, false, "Bundle benefit, if any."),
    FieldSpec::new("mediaAddons", Str, false, "Media add-ons, if any."),
    FieldSpec::new("premiumAddons", Str, false, "Premium add-ons, if any."),
    FieldSpec::new("basicService", Str, false, "Basic service description."),
];

static SHOW_PLAN_LISTS: CallSpec = CallSpec {
    name: CallName::ShowPlanLists,
    description: "Show plans to the user as a list of cards.",
    fields: &[FieldSpec::array_of("plans", "Plans to display.", &PLAN_ITEM)],
};

static TEXT_CARD: CallSpec = CallSpec {
    name: CallName::RequestTextCard,
    description: "Show a card with a title, description and a link button.",
    fields: &[
        FieldSpec::new("title", Str, true, "Card title."),
        FieldSpec::new("description", Str, true, "Card body text."),
        FieldSpec::new("url", Str, true, "Link opened by the button."),
        FieldSpec::new("buttonText", Str, true, "Button label."),
        FieldSpec::new("imageUrl", Str, false, "Card image; looked up from the link when omitted."),
    ],
};

static FIRST_CARD_LIST: CallSpec = CallSpec {
    name: CallName::ShowFirstCardList,
    description: "Return to the initial card list.",
    fields: &[],
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test arguments must be an object"),
        }
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        assert_eq!(CallName::parse("requestTextCard"), Some(CallName::RequestTextCard));
        assert_eq!(CallName::parse("requesttextcard"), None);
        assert_eq!(CallName::parse("deleteAccount"), None);
        assert!(describe("requestOTTServiceList").is_some());
        assert!("showPlans".parse::<CallName>().is_err());
    }

    #[test]
    fn names_round_trip_through_display() {
        for call in CallName::ALL {
            assert_eq!(CallName::parse(&call.to_string()), Some(call));
            assert_eq!(call.spec().name, call);
        }
    }

    #[test]
    fn text_card_reports_missing_fields() {
        let v = validate(
            CallName::RequestTextCard,
            &args(json!({"title": "A", "description": "", "buttonText": null})),
        );
        assert_eq!(v.missing, vec!["description", "url", "buttonText"]);
        assert!(v.mismatched.is_empty());
        assert!(!v.is_ok());
    }

    #[test]
    fn optional_field_may_be_absent() {
        let v = validate(
            CallName::RequestTextCard,
            &args(json!({"title": "A", "description": "B", "url": "https://x.test", "buttonText": "Go"})),
        );
        assert!(v.is_ok());
    }

    #[test]
    fn wrong_kind_is_mismatched() {
        let v = validate(CallName::RequestCarouselButtons, &args(json!({"items": "a,b"})));
        assert_eq!(v.mismatched, vec!["items"]);
        assert!(v.missing.is_empty());

        let v = validate(CallName::SearchPlans, &args(json!({"dataGb": "lots"})));
        assert_eq!(v.mismatched, vec!["dataGb"]);
    }

    #[test]
    fn calls_without_fields_accept_anything() {
        assert!(validate(CallName::ShowFirstCardList, &Map::new()).is_ok());
        assert!(validate(CallName::RequestOxCarouselButtons, &args(json!({"extra": 1}))).is_ok());
    }

    #[test]
    fn tool_definitions_cover_registry() {
        let tools = tool_definitions();
        assert_eq!(tools.len(), CallName::ALL.len());

        let card = &tools[5]["function"];
        assert_eq!(card["name"], "requestTextCard");
        assert_eq!(
            card["parameters"]["required"],
            json!(["title", "description", "url", "buttonText"])
        );

        let plans = &tools[4]["function"]["parameters"]["properties"]["plans"];
        assert_eq!(plans["type"], "array");
        assert_eq!(plans["items"]["properties"]["monthlyFee"]["type"], "number");
    }
}
