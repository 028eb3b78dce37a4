//! Staff-side form workflows: patient assessment and hospital onboarding.

pub mod assessment;
pub mod onboarding;

use thiserror::Error;

use crate::api::ApiError;

pub use assessment::{AssessmentForm, AssessmentWizard, Step, WizardMode};
pub use onboarding::{OnboardingError, OnboardingFlow, OnboardingStep};

/// One failed field check, ready to show next to the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProblem {
    pub field: &'static str,
    pub message: String,
}

impl FieldProblem {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("{step} is incomplete: {}", join_messages(.problems))]
    Invalid {
        step: Step,
        problems: Vec<FieldProblem>,
    },

    #[error("No assessment is open")]
    NotOpen,

    #[error("Submit is only available on the {0} step")]
    NotOnFinalStep(Step),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl FormError {
    /// Field problems, empty for non-validation errors.
    pub fn problems(&self) -> &[FieldProblem] {
        match self {
            Self::Invalid { problems, .. } => problems,
            _ => &[],
        }
    }
}

fn join_messages(problems: &[FieldProblem]) -> String {
    problems
        .iter()
        .map(|p| p.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Record a "{label} is required" problem when `value` is blank.
pub(crate) fn require(
    problems: &mut Vec<FieldProblem>,
    field: &'static str,
    label: &str,
    value: &str,
) -> bool {
    if value.trim().is_empty() {
        problems.push(FieldProblem::new(field, format!("{label} is required")));
        false
    } else {
        true
    }
}
