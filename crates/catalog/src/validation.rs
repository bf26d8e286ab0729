use std::fmt;

use shared::domain::FormDraft;
use thiserror::Error;

/// Whether a negative price is an acceptable catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PricePolicy {
    #[default]
    NonNegative,
    AllowNegative,
}

impl PricePolicy {
    pub fn from_allow_negative(allow: bool) -> Self {
        if allow {
            Self::AllowNegative
        } else {
            Self::NonNegative
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Name,
    Price,
    ImageUrl,
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Name => "name",
            Self::Price => "price",
            Self::ImageUrl => "image URL",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldProblem {
    Missing,
    NotANumber,
    NotFinite,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: DraftField,
    pub problem: FieldProblem,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.problem {
            FieldProblem::Missing => write!(f, "{} is required", self.field),
            FieldProblem::NotANumber => write!(f, "{} must be a number", self.field),
            FieldProblem::NotFinite => write!(f, "{} must be a finite number", self.field),
            FieldProblem::Negative => write!(f, "{} must not be negative", self.field),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", summarize(.issues))]
pub struct ValidationError {
    issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }
}

fn summarize(issues: &[FieldIssue]) -> String {
    if issues
        .iter()
        .any(|issue| issue.problem == FieldProblem::Missing)
    {
        return "Please fill in all fields".to_string();
    }
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Field values that passed validation, ready to become a product.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidFields {
    pub name: String,
    pub price: f64,
    pub image_url: String,
}

pub fn validate_draft(draft: &FormDraft, policy: PricePolicy) -> Result<ValidFields, ValidationError> {
    let mut issues = Vec::new();

    if draft.name.trim().is_empty() {
        issues.push(FieldIssue {
            field: DraftField::Name,
            problem: FieldProblem::Missing,
        });
    }

    let price = match parse_price(&draft.price, policy) {
        Ok(price) => Some(price),
        Err(problem) => {
            issues.push(FieldIssue {
                field: DraftField::Price,
                problem,
            });
            None
        }
    };

    if draft.image_url.trim().is_empty() {
        issues.push(FieldIssue {
            field: DraftField::ImageUrl,
            problem: FieldProblem::Missing,
        });
    }

    match price {
        Some(price) if issues.is_empty() => Ok(ValidFields {
            name: draft.name.clone(),
            price,
            image_url: draft.image_url.clone(),
        }),
        _ => Err(ValidationError { issues }),
    }
}

fn parse_price(raw: &str, policy: PricePolicy) -> Result<f64, FieldProblem> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(FieldProblem::Missing);
    }
    let price: f64 = raw.parse().map_err(|_| FieldProblem::NotANumber)?;
    if !price.is_finite() {
        return Err(FieldProblem::NotFinite);
    }
    if price < 0.0 && policy == PricePolicy::NonNegative {
        return Err(FieldProblem::Negative);
    }
    // folds -0 into 0
    Ok(if price == 0.0 { 0.0 } else { price })
}
