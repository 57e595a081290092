//! "Análisis" simulado de documentos: clasificación por palabras clave en el
//! nombre del fichero y selección de plantillas enlatadas.
//!
//! Las reglas se evalúan en orden y gana la primera que coincide; si ninguna
//! coincide se usa `DocumentType::Generic`.

use thiserror::Error;

use crate::models::{
    AnalysisResult, Clause, ClauseCategory, DocumentType, FileHandle, Level, RiskItem, Severity,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("el fichero no tiene nombre")]
    UnnamedFile,
}

/// Regla de clasificación: si el nombre contiene alguna de las palabras clave.
pub struct ClassificationRule {
    pub keywords: &'static [&'static str],
    pub document_type: DocumentType,
}

impl ClassificationRule {
    fn matches(&self, lowercase_name: &str) -> bool {
        self.keywords.iter().any(|k| lowercase_name.contains(k))
    }
}

pub const CLASSIFICATION_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        keywords: &["rental", "lease"],
        document_type: DocumentType::Rental,
    },
    ClassificationRule {
        keywords: &["loan", "credit"],
        document_type: DocumentType::Loan,
    },
    ClassificationRule {
        keywords: &["terms", "service"],
        document_type: DocumentType::TermsOfService,
    },
];

pub fn classify(file_name: &str) -> DocumentType {
    let lowercase_name = file_name.to_lowercase();
    CLASSIFICATION_RULES
        .iter()
        .find(|rule| rule.matches(&lowercase_name))
        .map(|rule| rule.document_type)
        .unwrap_or(DocumentType::Generic)
}

/// Produce el resultado a partir del nombre del fichero. Determinista.
pub fn analyze(file: &FileHandle) -> Result<AnalysisResult, AnalysisError> {
    if file.name.trim().is_empty() {
        return Err(AnalysisError::UnnamedFile);
    }

    let document_type = classify(&file.name);
    let (complexity, risk_level) = levels(document_type);

    Ok(AnalysisResult {
        document_type,
        document_type_label: document_type.display_name().to_string(),
        complexity,
        risk_level,
        summary: summary(document_type).to_string(),
        clauses: clauses(document_type),
        risks: risks(document_type),
        key_points: key_points(document_type)
            .iter()
            .map(|p| p.to_string())
            .collect(),
    })
}

fn levels(document_type: DocumentType) -> (Level, Level) {
    match document_type {
        DocumentType::Rental => (Level::High, Level::Medium),
        DocumentType::Loan => (Level::High, Level::High),
        DocumentType::TermsOfService | DocumentType::Generic => (Level::Medium, Level::Low),
    }
}

fn summary(document_type: DocumentType) -> &'static str {
    match document_type {
        DocumentType::Rental => "This is a rental agreement between you (tenant) and the property owner (landlord). The agreement outlines your rights and responsibilities as a tenant, including payment terms, property maintenance, and lease duration. It also specifies the landlord's obligations and the conditions for lease termination.",
        DocumentType::Loan => "This document is a loan agreement that outlines the terms and conditions of borrowing money. It includes the loan amount, interest rate, repayment schedule, and consequences of default. The contract also specifies collateral requirements and the lender's rights.",
        DocumentType::TermsOfService => "This document contains the terms and conditions for using a service or platform. It outlines user rights and responsibilities, service limitations, data usage policies, and dispute resolution procedures.",
        DocumentType::Generic => "This legal document contains important terms and conditions that affect your rights and obligations. It may include clauses related to payments, responsibilities, termination conditions, and legal remedies.",
    }
}

fn clause(title: &str, category: ClauseCategory, explanation: &str) -> Clause {
    Clause {
        title: title.to_string(),
        category,
        explanation: explanation.to_string(),
    }
}

// Los documentos genéricos reutilizan las plantillas de términos de servicio.
fn clauses(document_type: DocumentType) -> Vec<Clause> {
    use ClauseCategory::{Important, Warning};
    match document_type {
        DocumentType::Rental => vec![
            clause("Payment Terms", Important, "You must pay rent on the 1st of each month. Late fees of $50 apply after 5 days. Payment methods include check, money order, or electronic transfer."),
            clause("Security Deposit", Warning, "A security deposit of $1,500 is required before move-in. This deposit may be used for damages, unpaid rent, or cleaning costs beyond normal wear and tear."),
            clause("Property Maintenance", Important, "You are responsible for minor maintenance like changing light bulbs and keeping the property clean. The landlord handles major repairs and structural issues."),
            clause("Lease Termination", Important, "Either party can terminate the lease with 30 days written notice. Early termination may require payment of remaining rent or finding a replacement tenant."),
        ],
        DocumentType::Loan => vec![
            clause("Interest Rate", Warning, "The annual interest rate is 7.5% APR. Interest is calculated daily and added to your monthly payment. Rate may change based on market conditions."),
            clause("Repayment Schedule", Important, "Monthly payments of $450 are due on the 15th of each month. The loan term is 5 years with a total of 60 payments."),
            clause("Default Consequences", Warning, "Missing payments may result in late fees, credit reporting, and potential legal action. Default may trigger acceleration of the entire loan balance."),
            clause("Collateral", Important, "The loan is secured by your vehicle. The lender may repossess the vehicle if you default on payments."),
        ],
        DocumentType::TermsOfService | DocumentType::Generic => vec![
            clause("User Responsibilities", Important, "You must use the service lawfully and not violate any terms. You are responsible for maintaining the security of your account and password."),
            clause("Data Usage", Warning, "We collect and use your data as described in our privacy policy. Your data may be shared with third parties for service improvement."),
            clause("Service Limitations", Important, "The service is provided \"as is\" without warranties. We may limit or suspend service for violations or maintenance."),
            clause("Dispute Resolution", Important, "Disputes will be resolved through binding arbitration. You waive the right to participate in class action lawsuits."),
        ],
    }
}

fn risk(severity: Severity, title: &str, description: &str) -> RiskItem {
    RiskItem {
        severity,
        title: title.to_string(),
        description: description.to_string(),
    }
}

fn risks(document_type: DocumentType) -> Vec<RiskItem> {
    use Severity::{High, Low, Medium};
    match document_type {
        DocumentType::Rental => vec![
            risk(High, "High Late Fee", "$100 late fee after 5 days may be excessive compared to local standards"),
            risk(Medium, "Maintenance Responsibility", "Tenant responsible for minor repairs could include expensive items"),
            risk(Low, "Security Deposit", "Standard security deposit amount for the area"),
        ],
        DocumentType::Loan => vec![
            risk(High, "Variable Interest Rate", "Interest rate can increase, potentially doubling your monthly payment"),
            risk(High, "Prepayment Penalty", "Early loan payoff incurs a 2% penalty fee"),
            risk(Medium, "Default Acceleration", "Missing one payment triggers immediate demand for full balance"),
        ],
        DocumentType::TermsOfService | DocumentType::Generic => vec![
            risk(Medium, "Data Sharing", "Personal data may be sold to third parties without explicit consent"),
            risk(Low, "Service Changes", "Terms can be modified with 30 days notice"),
        ],
    }
}

fn key_points(document_type: DocumentType) -> &'static [&'static str] {
    match document_type {
        DocumentType::Rental => &[
            "Monthly rent: $1,200 due on the 1st",
            "Security deposit: $1,500",
            "Lease term: 12 months",
            "Late fee: $50 after 5 days",
            "Pet policy: No pets allowed",
        ],
        DocumentType::Loan => &[
            "Loan amount: $25,000",
            "Interest rate: 7.5% APR",
            "Monthly payment: $450",
            "Loan term: 5 years",
            "Collateral: Vehicle title",
        ],
        DocumentType::TermsOfService | DocumentType::Generic => &[
            "Account required for service access",
            "Data collection for service improvement",
            "No warranty on service availability",
            "Arbitration for disputes",
            "Terms can be modified with notice",
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze_name(name: &str) -> AnalysisResult {
        analyze(&FileHandle::new(name, 1024)).unwrap()
    }

    #[test]
    fn rental_and_lease_names_are_rental_agreements() {
        for name in ["rental.pdf", "My_LEASE_2024.docx", "sublease-final.txt"] {
            let result = analyze_name(name);
            assert_eq!(result.document_type, DocumentType::Rental, "{name}");
            assert_eq!(result.complexity, Level::High);
            assert_eq!(result.risk_level, Level::Medium);
            assert_eq!(result.clauses.len(), 4);
            assert_eq!(result.risks.len(), 3);
        }
    }

    #[test]
    fn loan_and_credit_names_are_loan_contracts() {
        for name in ["car-loan.pdf", "CreditCard.pdf"] {
            let result = analyze_name(name);
            assert_eq!(result.document_type, DocumentType::Loan, "{name}");
            assert_eq!(result.document_type_label, "Loan Contract");
            assert_eq!(result.complexity, Level::High);
            assert_eq!(result.risk_level, Level::High);
        }
    }

    #[test]
    fn terms_and_service_names_are_terms_of_service() {
        for name in ["terms.html", "service-agreement.pdf"] {
            let result = analyze_name(name);
            assert_eq!(result.document_type, DocumentType::TermsOfService, "{name}");
            assert_eq!(result.complexity, Level::Medium);
            assert_eq!(result.risk_level, Level::Low);
        }
    }

    #[test]
    fn earlier_rules_win_when_several_keywords_match() {
        assert_eq!(classify("lease-terms-of-service.pdf"), DocumentType::Rental);
        assert_eq!(classify("credit-service.pdf"), DocumentType::Loan);
    }

    #[test]
    fn unmatched_names_fall_back_to_generic_with_tos_shaped_templates() {
        let result = analyze_name("contract.pdf");
        assert_eq!(result.document_type, DocumentType::Generic);
        assert_eq!(result.document_type_label, "Legal Document");
        assert!(result.summary.starts_with("This legal document"));
        assert_eq!(result.clauses[0].title, "User Responsibilities");
        assert_eq!(result.risks.len(), 2);
        assert_eq!(result.key_points[0], "Account required for service access");
    }

    #[test]
    fn blank_names_are_rejected() {
        let err = analyze(&FileHandle::new("   ", 0)).unwrap_err();
        assert_eq!(err, AnalysisError::UnnamedFile);
    }
}
