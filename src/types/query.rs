//! Query-type tags and their prompting instructions.

use serde::{Deserialize, Serialize};

/// Kind of question being asked about a document.
///
/// Each tag maps to a specific instruction line in the generated prompt,
/// steering the model towards the expected answer shape. Untagged queries
/// get a generic grounding instruction (see [`QueryType::instruction`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// Summarise key features and benefits.
    Descriptive,
    /// Extract specific details and structured information.
    Detail,
    /// Compare options and recommend.
    Comparative,
    /// Explain a concept in simple terms.
    Concept,
    /// List coverage limits, exclusions, and conditions.
    Coverage,
    /// Summarise financial terms and payment conditions.
    Financial,
}

impl QueryType {
    /// Stable lowercase name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Descriptive => "descriptive",
            QueryType::Detail => "detail",
            QueryType::Comparative => "comparative",
            QueryType::Concept => "concept",
            QueryType::Coverage => "coverage",
            QueryType::Financial => "financial",
        }
    }

    /// Prompt instruction for this query type.
    pub fn instruction(&self) -> &'static str {
        match self {
            QueryType::Descriptive => {
                "Provide a comprehensive summary of the key features and benefits."
            }
            QueryType::Detail => "Extract specific details and structured information clearly.",
            QueryType::Comparative => {
                "Compare the options and provide a recommendation with reasoning."
            }
            QueryType::Concept => "Explain the concept in simple terms that anyone can understand.",
            QueryType::Coverage => "List the coverage limits, exclusions, and conditions clearly.",
            QueryType::Financial => {
                "Summarize the financial terms, premiums, and payment conditions."
            }
        }
    }

    /// Instruction used when no query type is tagged.
    pub fn default_instruction() -> &'static str {
        "Provide a clear and accurate answer based *only* on the document and conversation history."
    }
}
