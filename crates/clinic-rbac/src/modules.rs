//! # Modules
//!
//! Defines the closed set of feature modules a clinic can switch on or off.
//! Every module identifier is also the label shown in navigation, so the
//! stored form keeps its accents (`"Comunicação"`, `"Relatórios"`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Feature areas of the clinic application.
///
/// Declaration order is the registry order: it drives menu order and the
/// order of entries in default permission matrices.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Module {
    /// Landing dashboard with clinic indicators.
    Dashboard,
    /// Appointment scheduling.
    Agenda,
    /// Consultations, including video consultations.
    Consulta,
    /// Patient records.
    Pacientes,
    /// Patient relationship management.
    #[serde(rename = "CRM")]
    Crm,
    /// Accounts payable/receivable.
    Financeiro,
    /// Patient payments.
    Pagamentos,
    /// Team and role administration.
    Equipe,
    /// Stock and supplies.
    Estoque,
    /// Messaging with patients.
    #[serde(rename = "Comunicação")]
    Comunicacao,
    /// Reports.
    #[serde(rename = "Relatórios")]
    Relatorios,
    /// Support tickets.
    Suporte,
    /// Clinic settings.
    #[serde(rename = "Configurações")]
    Configuracoes,
    /// Health insurance agreements and TISS claims.
    #[serde(rename = "Convênios")]
    Convenios,
}

impl Module {
    /// Get the storage identifier of the module.
    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Dashboard => "Dashboard",
            Module::Agenda => "Agenda",
            Module::Consulta => "Consulta",
            Module::Pacientes => "Pacientes",
            Module::Crm => "CRM",
            Module::Financeiro => "Financeiro",
            Module::Pagamentos => "Pagamentos",
            Module::Equipe => "Equipe",
            Module::Estoque => "Estoque",
            Module::Comunicacao => "Comunicação",
            Module::Relatorios => "Relatórios",
            Module::Suporte => "Suporte",
            Module::Configuracoes => "Configurações",
            Module::Convenios => "Convênios",
        }
    }

    /// Parse a module from its identifier.
    ///
    /// # Arguments
    ///
    /// * `s` - Identifier, case-insensitive; the unaccented spelling is accepted too
    ///
    /// # Returns
    ///
    /// `Some(Module)` if valid, `None` otherwise
    ///
    /// # Example
    ///
    /// ```
    /// use clinic_rbac::modules::Module;
    ///
    /// assert_eq!(Module::parse("Financeiro"), Some(Module::Financeiro));
    /// assert_eq!(Module::parse("comunicacao"), Some(Module::Comunicacao));
    /// assert_eq!(Module::parse("Relatórios"), Some(Module::Relatorios));
    /// assert_eq!(Module::parse("invalid"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "dashboard" => Some(Module::Dashboard),
            "agenda" => Some(Module::Agenda),
            "consulta" => Some(Module::Consulta),
            "pacientes" => Some(Module::Pacientes),
            "crm" => Some(Module::Crm),
            "financeiro" => Some(Module::Financeiro),
            "pagamentos" => Some(Module::Pagamentos),
            "equipe" => Some(Module::Equipe),
            "estoque" => Some(Module::Estoque),
            "comunicação" | "comunicacao" => Some(Module::Comunicacao),
            "relatórios" | "relatorios" => Some(Module::Relatorios),
            "suporte" => Some(Module::Suporte),
            "configurações" | "configuracoes" => Some(Module::Configuracoes),
            "convênios" | "convenios" => Some(Module::Convenios),
            _ => None,
        }
    }

    /// Look up a module by its exact stored identifier.
    ///
    /// Stored settings and role matrices use this instead of [`Module::parse`],
    /// so `"financeiro"` and `"Financeiro"` can never both name one module.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::all().into_iter().find(|module| module.as_str() == key)
    }

    /// Get all modules in registry order.
    ///
    /// # Returns
    ///
    /// A vector of all 14 modules, in the fixed display order.
    pub fn all() -> Vec<Self> {
        vec![
            Module::Dashboard,
            Module::Agenda,
            Module::Consulta,
            Module::Pacientes,
            Module::Crm,
            Module::Financeiro,
            Module::Pagamentos,
            Module::Equipe,
            Module::Estoque,
            Module::Comunicacao,
            Module::Relatorios,
            Module::Suporte,
            Module::Configuracoes,
            Module::Convenios,
        ]
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_modules_count_and_order() {
        let all = Module::all();
        assert_eq!(all.len(), 14);
        assert_eq!(all.first(), Some(&Module::Dashboard));
        assert_eq!(all.last(), Some(&Module::Convenios));

        let mut sorted = all.clone();
        sorted.sort();
        assert_eq!(sorted, all);
    }

    #[test]
    fn test_module_parsing() {
        for module in Module::all() {
            assert_eq!(Module::parse(module.as_str()), Some(module));
        }
        assert_eq!(Module::parse("PACIENTES"), Some(Module::Pacientes));
        assert_eq!(Module::parse("configuracoes"), Some(Module::Configuracoes));
        assert_eq!(Module::parse("convenios"), Some(Module::Convenios));
        assert_eq!(Module::parse(""), None);
        assert_eq!(Module::parse("TISS"), None);
    }

    #[test]
    fn test_from_key_is_exact() {
        for module in Module::all() {
            assert_eq!(Module::from_key(module.as_str()), Some(module));
        }
        assert_eq!(Module::from_key("financeiro"), None);
        assert_eq!(Module::from_key("Relatorios"), None);
        assert_eq!(Module::from_key(" CRM"), None);
    }

    #[test]
    fn test_serde_uses_identifier() {
        let json = serde_json::to_string(&Module::Comunicacao).unwrap();
        assert_eq!(json, "\"Comunicação\"");

        let module: Module = serde_json::from_str("\"CRM\"").unwrap();
        assert_eq!(module, Module::Crm);
    }

    #[test]
    fn test_display_matches_as_str() {
        assert_eq!(Module::Relatorios.to_string(), "Relatórios");
    }
}
