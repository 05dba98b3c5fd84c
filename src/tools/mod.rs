//! Tool registry
//!
//! Declares the fixed set of evidence-gathering tools the reasoning driver
//! may invoke. Each tool carries a typed argument schema and a binding to
//! one evidence store operation; polymorphism here is over a closed
//! capability set, not open-ended dispatch.

use crate::error::AgentError;
use crate::models::{EvidenceRecord, ToolCall};
use crate::store::EvidenceStore;
use crate::Result;
use serde_json::{json, Map, Value};
use std::sync::Arc;

//
// ================= Argument Schemas =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    Str,
    Int,
}

#[derive(Debug, Clone)]
pub struct ArgSpec {
    pub name: &'static str,
    pub ty: ArgType,
    pub required: bool,
    pub description: &'static str,
    /// Applied when an optional integer argument is omitted.
    pub default: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub args: Vec<ArgSpec>,
}

impl ToolSpec {
    /// JSON schema rendering sent to the reasoning driver.
    pub fn to_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for arg in &self.args {
            let ty = match arg.ty {
                ArgType::Str => "string",
                ArgType::Int => "integer",
            };
            properties.insert(
                arg.name.to_string(),
                json!({ "type": ty, "description": arg.description }),
            );
            if arg.required {
                required.push(arg.name);
            }
        }

        json!({
            "name": self.name,
            "description": self.description,
            "input_schema": {
                "type": "object",
                "properties": properties,
                "required": required,
            }
        })
    }
}

//
// ================= Validated Arguments =================
//

/// Argument map that passed schema validation for one tool spec.
struct ValidatedArgs<'a> {
    args: &'a Map<String, Value>,
    spec: &'a ToolSpec,
}

impl<'a> ValidatedArgs<'a> {
    fn check(spec: &'a ToolSpec, args: &'a Map<String, Value>) -> Result<Self> {
        for key in args.keys() {
            if !spec.args.iter().any(|a| a.name == key) {
                return Err(AgentError::InvalidArguments(format!(
                    "{}: unexpected argument '{}'",
                    spec.name, key
                )));
            }
        }

        for arg in &spec.args {
            match args.get(arg.name) {
                None if arg.required => {
                    return Err(AgentError::InvalidArguments(format!(
                        "{}: missing required argument '{}'",
                        spec.name, arg.name
                    )));
                }
                None => {}
                Some(value) => {
                    // Strict typing, no coercion: "5" is not an integer
                    // and 5 is not a string.
                    let ok = match arg.ty {
                        ArgType::Str => value.is_string(),
                        ArgType::Int => value.as_i64().is_some(),
                    };
                    if !ok {
                        return Err(AgentError::InvalidArguments(format!(
                            "{}: argument '{}' has wrong type (got {})",
                            spec.name, arg.name, value
                        )));
                    }
                }
            }
        }

        Ok(Self { args, spec })
    }

    fn str(&self, name: &str) -> &str {
        self.args
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    fn int(&self, name: &str) -> i64 {
        self.args.get(name).and_then(Value::as_i64).unwrap_or_else(|| {
            self.spec
                .args
                .iter()
                .find(|a| a.name == name)
                .and_then(|a| a.default)
                .unwrap_or(0)
        })
    }

    fn limit(&self, name: &str) -> usize {
        self.int(name).max(0) as usize
    }
}

//
// ================= Registry =================
//

/// Fixed mapping from tool name to argument schema and evidence store
/// operation.
pub struct ToolRegistry {
    store: Arc<dyn EvidenceStore>,
    specs: Vec<ToolSpec>,
}

impl ToolRegistry {
    pub fn new(store: Arc<dyn EvidenceStore>) -> Self {
        Self {
            store,
            specs: builtin_specs(),
        }
    }

    /// Schemas for every registered tool, for the driver prompt.
    pub fn schemas(&self) -> Vec<Value> {
        self.specs.iter().map(ToolSpec::to_schema).collect()
    }

    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    /// Validate and execute one tool call.
    ///
    /// `UnknownTool` / `InvalidArguments` are returned as errors for the
    /// caller to surface. An evidence-source failure is downgraded to a
    /// `ToolError` evidence entry so the investigation can continue with
    /// partial information; a missing collection (`NotFound`) propagates
    /// because no evidence can ever be gathered from it.
    pub async fn invoke(&self, call: &ToolCall) -> Result<Vec<EvidenceRecord>> {
        let spec = self
            .specs
            .iter()
            .find(|s| s.name == call.name)
            .ok_or_else(|| AgentError::UnknownTool(call.name.clone()))?;

        let args = ValidatedArgs::check(spec, &call.arguments)?;

        let outcome = match spec.name {
            "query_similar_cases" => {
                self.store
                    .query_similar_cases(args.str("description"), args.limit("n_results"))
                    .await
            }
            "search_fraud_patterns" => {
                self.store
                    .search_fraud_patterns(args.str("indicators"), args.limit("n_results"))
                    .await
            }
            "search_similar_profiles" => {
                self.store
                    .search_similar_profiles(args.str("description"), args.limit("n_results"))
                    .await
            }
            "fetch_kyc_profile" => self.store.fetch_kyc_profile(args.str("customer_id")).await,
            "query_siem_events" => {
                self.store
                    .query_siem_events(
                        args.str("customer_id"),
                        args.int("hours_back").max(0) as u32,
                        args.limit("limit"),
                    )
                    .await
            }
            "get_transaction_details" => {
                self.store.get_transaction(args.str("transaction_id")).await
            }
            "get_transaction_history" => {
                self.store
                    .transaction_history(
                        args.str("customer_id"),
                        args.int("days_back").max(0) as u32,
                        args.limit("limit"),
                    )
                    .await
            }
            // unreachable while specs and dispatch arms stay in sync
            other => return Err(AgentError::UnknownTool(other.to_string())),
        };

        match outcome {
            Ok(records) => Ok(records),
            Err(AgentError::NotFound(collection)) => Err(AgentError::NotFound(collection)),
            Err(e) => Ok(vec![EvidenceRecord::ToolError {
                tool: spec.name.to_string(),
                message: e.to_string(),
            }]),
        }
    }
}

fn builtin_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "query_similar_cases",
            description: "Search past investigation cases similar to a description. \
                          Returns cases with fraud types, outcomes and similarity scores.",
            args: vec![
                ArgSpec {
                    name: "description",
                    ty: ArgType::Str,
                    required: true,
                    description: "Description of the suspicious activity",
                    default: None,
                },
                ArgSpec {
                    name: "n_results",
                    ty: ArgType::Int,
                    required: false,
                    description: "Number of similar cases to return",
                    default: Some(5),
                },
            ],
        },
        ToolSpec {
            name: "search_fraud_patterns",
            description: "Match observed indicators to known fraud typologies. \
                          Returns pattern names, risk levels and match scores.",
            args: vec![
                ArgSpec {
                    name: "indicators",
                    ty: ArgType::Str,
                    required: true,
                    description: "Observed red flags or suspicious indicators",
                    default: None,
                },
                ArgSpec {
                    name: "n_results",
                    ty: ArgType::Int,
                    required: false,
                    description: "Number of patterns to return",
                    default: Some(3),
                },
            ],
        },
        ToolSpec {
            name: "search_similar_profiles",
            description: "Find customers with similar profiles via semantic search. \
                          Useful to check whether comparable customers had fraud.",
            args: vec![
                ArgSpec {
                    name: "description",
                    ty: ArgType::Str,
                    required: true,
                    description: "Customer characteristics to match",
                    default: None,
                },
                ArgSpec {
                    name: "n_results",
                    ty: ArgType::Int,
                    required: false,
                    description: "Number of profiles to return",
                    default: Some(5),
                },
            ],
        },
        ToolSpec {
            name: "fetch_kyc_profile",
            description: "Retrieve a customer's KYC profile: risk score, country, \
                          account age and profile summary.",
            args: vec![ArgSpec {
                name: "customer_id",
                ty: ArgType::Str,
                required: true,
                description: "Customer identifier",
                default: None,
            }],
        },
        ToolSpec {
            name: "query_siem_events",
            description: "Search security event logs for a customer's recent activity: \
                          logins, password resets, suspicious locations.",
            args: vec![
                ArgSpec {
                    name: "customer_id",
                    ty: ArgType::Str,
                    required: true,
                    description: "Customer identifier",
                    default: None,
                },
                ArgSpec {
                    name: "hours_back",
                    ty: ArgType::Int,
                    required: false,
                    description: "Hours of history to search",
                    default: Some(24),
                },
                ArgSpec {
                    name: "limit",
                    ty: ArgType::Int,
                    required: false,
                    description: "Maximum events to return",
                    default: Some(20),
                },
            ],
        },
        ToolSpec {
            name: "get_transaction_details",
            description: "Fetch full details of a specific transaction: amount, \
                          timing features and anomaly score.",
            args: vec![ArgSpec {
                name: "transaction_id",
                ty: ArgType::Str,
                required: true,
                description: "Transaction identifier",
                default: None,
            }],
        },
        ToolSpec {
            name: "get_transaction_history",
            description: "Aggregate a customer's transaction history over a time \
                          window: counts, totals and night/weekend activity.",
            args: vec![
                ArgSpec {
                    name: "customer_id",
                    ty: ArgType::Str,
                    required: true,
                    description: "Customer identifier",
                    default: None,
                },
                ArgSpec {
                    name: "days_back",
                    ty: ArgType::Int,
                    required: false,
                    description: "Days of history",
                    default: Some(30),
                },
                ArgSpec {
                    name: "limit",
                    ty: ArgType::Int,
                    required: false,
                    description: "Maximum transactions to aggregate",
                    default: Some(50),
                },
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryEvidenceStore;

    fn call(name: &str, args: Value) -> ToolCall {
        ToolCall {
            name: name.to_string(),
            arguments: args.as_object().cloned().unwrap_or_default(),
        }
    }

    fn registry() -> ToolRegistry {
        let store = InMemoryEvidenceStore::new().with_case(EvidenceRecord::Case {
            case_id: "CASE-1".to_string(),
            fraud_type: "account_takeover".to_string(),
            status: "confirmed".to_string(),
            summary: "Password reset followed by transfer".to_string(),
            similarity: 0.8,
        });
        ToolRegistry::new(Arc::new(store))
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let err = registry()
            .invoke(&call("delete_everything", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::UnknownTool(name) if name == "delete_everything"));
    }

    #[tokio::test]
    async fn missing_required_argument_is_rejected() {
        let err = registry()
            .invoke(&call("query_similar_cases", json!({ "n_results": 3 })))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn mistyped_argument_is_never_coerced() {
        // A number where a string is required.
        let err = registry()
            .invoke(&call("fetch_kyc_profile", json!({ "customer_id": 42 })))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments(_)));

        // A string where an integer is required.
        let err = registry()
            .invoke(&call(
                "query_similar_cases",
                json!({ "description": "x", "n_results": "5" }),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn unexpected_argument_is_rejected() {
        let err = registry()
            .invoke(&call(
                "fetch_kyc_profile",
                json!({ "customer_id": "CUST-1", "verbose": true }),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn valid_call_returns_records() {
        let records = registry()
            .invoke(&call(
                "query_similar_cases",
                json!({ "description": "password reset then transfer" }),
            ))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn store_failure_becomes_tool_error_evidence() {
        struct FailingStore;

        #[async_trait::async_trait]
        impl EvidenceStore for FailingStore {
            async fn query_similar_cases(&self, _: &str, _: usize) -> Result<Vec<EvidenceRecord>> {
                Err(AgentError::ToolError("connection refused".to_string()))
            }
            async fn search_fraud_patterns(
                &self,
                _: &str,
                _: usize,
            ) -> Result<Vec<EvidenceRecord>> {
                Err(AgentError::ToolError("connection refused".to_string()))
            }
            async fn search_similar_profiles(
                &self,
                _: &str,
                _: usize,
            ) -> Result<Vec<EvidenceRecord>> {
                Err(AgentError::ToolError("connection refused".to_string()))
            }
            async fn fetch_kyc_profile(&self, _: &str) -> Result<Vec<EvidenceRecord>> {
                Err(AgentError::ToolError("connection refused".to_string()))
            }
            async fn get_transaction(&self, _: &str) -> Result<Vec<EvidenceRecord>> {
                Err(AgentError::ToolError("connection refused".to_string()))
            }
            async fn transaction_history(
                &self,
                _: &str,
                _: u32,
                _: usize,
            ) -> Result<Vec<EvidenceRecord>> {
                Err(AgentError::ToolError("connection refused".to_string()))
            }
            async fn query_siem_events(
                &self,
                _: &str,
                _: u32,
                _: usize,
            ) -> Result<Vec<EvidenceRecord>> {
                Err(AgentError::ToolError("connection refused".to_string()))
            }
        }

        let registry = ToolRegistry::new(Arc::new(FailingStore));
        let records = registry
            .invoke(&call(
                "query_similar_cases",
                json!({ "description": "anything" }),
            ))
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert!(records[0].is_error());
    }

    #[tokio::test]
    async fn uninitialized_collection_propagates_not_found() {
        let registry = ToolRegistry::new(Arc::new(InMemoryEvidenceStore::uninitialized()));
        let err = registry
            .invoke(&call(
                "query_similar_cases",
                json!({ "description": "anything" }),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::NotFound(_)));
    }

    #[test]
    fn schemas_cover_all_seven_tools() {
        let schemas = registry().schemas();
        assert_eq!(schemas.len(), 7);
        let names: Vec<&str> = schemas
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"query_similar_cases"));
        assert!(names.contains(&"get_transaction_history"));
    }
}
