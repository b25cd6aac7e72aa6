use serde::Serialize;

use super::parameters::{standard_parameters, ParameterId, PricingParameter};

/// Pricing rule family a task belongs to. Fixed when the catalog is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Travel,
    GeometricSurvey,
    PlanRealization,
    SafetyNotice,
    AccessibilityNotice,
    DerogationRequest,
    FormFilling,
    Dispatch,
    Printing,
    General,
}

impl TaskCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Travel => "Travel",
            Self::GeometricSurvey => "Geometric survey",
            Self::PlanRealization => "Plan realization",
            Self::SafetyNotice => "Safety notice",
            Self::AccessibilityNotice => "Accessibility notice",
            Self::DerogationRequest => "Derogation request",
            Self::FormFilling => "Form filling",
            Self::Dispatch => "Dispatch",
            Self::Printing => "Printing",
            Self::General => "General",
        }
    }

    /// Parameters whose value can change the price of a task in this category.
    pub const fn pricing_parameters(self) -> &'static [ParameterId] {
        match self {
            Self::Travel => &[ParameterId::Distance],
            Self::GeometricSurvey => &[
                ParameterId::GroundArea,
                ParameterId::FloorsNumber,
                ParameterId::MainRoomsNumber,
            ],
            Self::PlanRealization => &[
                ParameterId::GroundArea,
                ParameterId::FloorsNumber,
                ParameterId::MainRoomsNumber,
                ParameterId::NeedsPlans,
            ],
            Self::SafetyNotice | Self::AccessibilityNotice => &[ParameterId::ErpRanking],
            Self::DerogationRequest => &[ParameterId::DerogationsNumber],
            Self::Printing => &[ParameterId::CopiesNumber, ParameterId::FloorsNumber],
            Self::FormFilling | Self::Dispatch | Self::General => &[],
        }
    }
}

/// Who usually performs the work, used to estimate subcontracting cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trade {
    Architect,
    Maintenance,
    Consultant,
}

impl Trade {
    /// Share of the billed amount expected to go to the subcontractor.
    pub const fn subcontractor_share(self) -> f64 {
        match self {
            Self::Architect => 0.7,
            Self::Maintenance => 0.5,
            Self::Consultant => 0.6,
        }
    }
}

/// Billable unit of work.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: &'static str,
    pub name: &'static str,
    pub category: TaskCategory,
    pub trade: Trade,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_unit_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_rate_per_area: Option<f64>,
}

/// Named grouping of tasks used for display and subtotal rollup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    pub id: &'static str,
    pub name: &'static str,
    pub task_ids: Vec<&'static str>,
}

impl Service {
    pub fn contains(&self, task_id: &str) -> bool {
        self.task_ids.iter().any(|id| *id == task_id)
    }
}

/// Read-only catalog of tasks, services and pricing parameters.
#[derive(Debug, Clone)]
pub struct Catalog {
    tasks: Vec<Task>,
    services: Vec<Service>,
    parameters: Vec<PricingParameter>,
}

impl Catalog {
    pub fn new(tasks: Vec<Task>, services: Vec<Service>, parameters: Vec<PricingParameter>) -> Self {
        Self {
            tasks,
            services,
            parameters,
        }
    }

    pub fn standard() -> Self {
        Self::new(standard_tasks(), standard_services(), standard_parameters())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn parameters(&self) -> &[PricingParameter] {
        &self.parameters
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn service(&self, service_id: &str) -> Option<&Service> {
        self.services.iter().find(|service| service.id == service_id)
    }

    pub fn service_for_task(&self, task_id: &str) -> Option<&Service> {
        self.services.iter().find(|service| service.contains(task_id))
    }

    pub fn tasks_for_service(&self, service_id: &str) -> Vec<&Task> {
        self.service(service_id)
            .map(|service| {
                service
                    .task_ids
                    .iter()
                    .filter_map(|id| self.task(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Flattens explicit task ids and whole services into one ordered,
    /// duplicate-free task selection. Explicit tasks come first.
    pub fn expand_selection<T, S>(&self, task_ids: &[T], service_ids: &[S]) -> Vec<String>
    where
        T: AsRef<str>,
        S: AsRef<str>,
    {
        let mut selection: Vec<String> = Vec::new();
        let mut push = |id: &str| {
            if !selection.iter().any(|existing| existing == id) {
                selection.push(id.to_string());
            }
        };

        for id in task_ids {
            push(id.as_ref());
        }
        for service_id in service_ids {
            if let Some(service) = self.service(service_id.as_ref()) {
                for id in &service.task_ids {
                    push(*id);
                }
            }
        }

        selection
    }
}

const TRAVEL_PRICE: f64 = 150.0;
const DRAFTING_PRICE: f64 = 250.0;
const MAINTENANCE_PRICE: f64 = 100.0;
const DEFAULT_PRICE: f64 = 50.0;

fn task(
    id: &'static str,
    name: &'static str,
    category: TaskCategory,
    trade: Trade,
    base_unit_price: f64,
) -> Task {
    Task {
        id,
        name,
        category,
        trade,
        base_unit_price: Some(base_unit_price),
        base_rate_per_area: None,
    }
}

fn standard_tasks() -> Vec<Task> {
    use TaskCategory::*;
    use Trade::*;

    vec![
        // AT
        task("deplacement_architecte_at", "Déplacement Architecte (AT)", Travel, Architect, TRAVEL_PRICE),
        task("releve_geometrique_at", "Relevé géométrique (AT)", GeometricSurvey, Architect, DEFAULT_PRICE),
        task("realisation_plans_existant_at", "Réalisation des plans de l'existant (AT)", PlanRealization, Architect, DRAFTING_PRICE),
        task("realisation_plans_projet_at", "Réalisation des plans à l'état projeté (AT)", PlanRealization, Architect, DRAFTING_PRICE),
        task("redaction_notice_securite_at", "Rédaction notice de sécurité (AT)", SafetyNotice, Consultant, DRAFTING_PRICE),
        task("redaction_notice_accessibilite_at", "Rédaction notice d'accessibilité (AT)", AccessibilityNotice, Consultant, DRAFTING_PRICE),
        task("redaction_demande_derogation_at", "Rédaction demande de dérogation (AT)", DerogationRequest, Consultant, DRAFTING_PRICE),
        task("renseignement_formulaire_cerfa_at", "Renseignement du formulaire cerfa (AT)", FormFilling, Consultant, DEFAULT_PRICE),
        task("impression_dossier_at", "Impression dossier (AT)", Printing, Consultant, DEFAULT_PRICE),
        task("expedition_courrier_recommande_at", "Expédition par courrier recommandé (AT)", Dispatch, Consultant, DEFAULT_PRICE),
        task("deplacement_preventionniste_at", "Déplacement préventionniste (AT)", Travel, Consultant, TRAVEL_PRICE),
        task("relecture_annotation_plans_architecte_at", "Relecture et annotation des plans d'architecte (AT)", General, Architect, DEFAULT_PRICE),
        // AMO
        task("redaction_notice_securite_amo", "Rédaction notice de sécurité (AMO)", SafetyNotice, Consultant, DRAFTING_PRICE),
        task("redaction_notice_accessibilite_amo", "Rédaction notice d'accessibilité (AMO)", AccessibilityNotice, Consultant, DRAFTING_PRICE),
        task("redaction_demande_derogation_amo", "Rédaction demande de dérogation (AMO)", DerogationRequest, Consultant, DRAFTING_PRICE),
        task("relecture_annotation_plans_architecte_amo", "Relecture et annotation des plans d'architecte (AMO)", General, Architect, DEFAULT_PRICE),
        // DP
        task("deplacement_architecte_dp", "Déplacement Architecte (DP)", Travel, Architect, TRAVEL_PRICE),
        task("releve_geometrique_dp", "Relevé géométrique (DP)", GeometricSurvey, Architect, DEFAULT_PRICE),
        task("realisation_plans_existant_dp", "Réalisation des plans de l'existant (DP)", PlanRealization, Architect, DRAFTING_PRICE),
        task("realisation_plans_projet_dp", "Réalisation des plans à l'état projeté (DP)", PlanRealization, Architect, DRAFTING_PRICE),
        task("renseignement_formulaire_cerfa_dp", "Renseignement du formulaire cerfa (DP)", FormFilling, Consultant, DEFAULT_PRICE),
        task("impression_dossier_dp", "Impression dossier (DP)", Printing, Consultant, DEFAULT_PRICE),
        task("expedition_courrier_recommande_dp", "Expédition par courrier recommandé (DP)", Dispatch, Consultant, DEFAULT_PRICE),
        task("realisation_reportage_photographique_dp", "Réalisation d'un reportage photographique (DP)", General, Consultant, DEFAULT_PRICE),
        task("realisation_photomontage_dp", "Réalisation de photomontage (DP)", General, Consultant, DEFAULT_PRICE),
        // Demande d'enseigne
        task("deplacement_architecte_enseigne", "Déplacement Architecte (Enseigne)", Travel, Architect, TRAVEL_PRICE),
        task("releve_geometrique_enseigne", "Relevé géométrique (Enseigne)", GeometricSurvey, Architect, DEFAULT_PRICE),
        task("realisation_plans_existant_enseigne", "Réalisation des plans de l'existant (Enseigne)", PlanRealization, Architect, DRAFTING_PRICE),
        task("renseignement_formulaire_cerfa_enseigne", "Renseignement du formulaire cerfa (Enseigne)", FormFilling, Consultant, DEFAULT_PRICE),
        task("impression_dossier_enseigne", "Impression dossier (Enseigne)", Printing, Consultant, DEFAULT_PRICE),
        task("expedition_courrier_recommande_enseigne", "Expédition par courrier recommandé (Enseigne)", Dispatch, Consultant, DEFAULT_PRICE),
        task("realisation_photomontage_enseigne", "Réalisation de photomontage (Enseigne)", General, Consultant, DEFAULT_PRICE),
        // Audit sécurité
        task("deplacement_preventionniste_audit_sec", "Déplacement préventionniste (Audit Sec.)", Travel, Consultant, TRAVEL_PRICE),
        task("redaction_rapport_audit_sec", "Rédaction d'un rapport d'audit (Sécurité)", General, Consultant, DRAFTING_PRICE),
        task("visite_audit_sec", "Visite d'audit (Sécurité)", General, Consultant, DEFAULT_PRICE),
        task("assistance_commission_securite_audit_sec", "Assistance à commission de sécurité (Audit Sec.)", General, Consultant, DEFAULT_PRICE),
        // Audit accessibilité
        task("deplacement_preventionniste_audit_acc", "Déplacement préventionniste (Audit Acc.)", Travel, Consultant, TRAVEL_PRICE),
        task("redaction_rapport_audit_acc", "Rédaction d'un rapport d'audit (Accessibilité)", General, Consultant, DRAFTING_PRICE),
        task("visite_audit_acc", "Visite d'audit (Accessibilité)", General, Consultant, DEFAULT_PRICE),
        // RUS
        task("deplacement_preventionniste_rus", "Déplacement préventionniste (RUS)", Travel, Consultant, TRAVEL_PRICE),
        task("suivi_administratif_annuel_rus", "Suivi administratif annuel (RUS)", General, Consultant, DEFAULT_PRICE),
        task("visite_audit_rus", "Visite d'audit (RUS)", General, Consultant, DEFAULT_PRICE),
        task("responsabilite_juridique_rus", "Responsabilité juridique (RUS)", General, Consultant, DEFAULT_PRICE),
        task("visa_rus", "Visa du RUS", General, Consultant, DEFAULT_PRICE),
        // Suivi d'établissement
        task("deplacement_preventionniste_suivi", "Déplacement préventionniste (Suivi)", Travel, Consultant, TRAVEL_PRICE),
        task("suivi_administratif_annuel_suivi", "Suivi administratif annuel (Suivi)", General, Consultant, DEFAULT_PRICE),
        task("visite_audit_suivi", "Visite d'audit (Suivi)", General, Consultant, DEFAULT_PRICE),
        task("assistance_commission_securite_suivi", "Assistance à commission de sécurité (Suivi)", General, Consultant, DEFAULT_PRICE),
        // Plans de secours
        task("deplacement_architecte_plans", "Déplacement Architecte (Plans)", Travel, Architect, TRAVEL_PRICE),
        task("releve_geometrique_plans", "Relevé géométrique (Plans)", GeometricSurvey, Architect, DEFAULT_PRICE),
        task("realisation_plans_existant_plans", "Réalisation des plans de l'existant (Plans)", PlanRealization, Architect, DRAFTING_PRICE),
        task("realisation_plan_intervention", "Réalisation plan d'intervention", General, Architect, DEFAULT_PRICE),
        task("realisation_plan_evacuation", "Réalisation plan d'évacuation", General, Architect, DEFAULT_PRICE),
        task("realisation_plan_chambre", "Réalisation plan de chambre", General, Architect, DEFAULT_PRICE),
        task("fourniture_cadres_clic_clac", "Fourniture cadres clic-clac", General, Consultant, DEFAULT_PRICE),
        task("impression_plans", "Impression (suivant format et supports)", Printing, Consultant, DEFAULT_PRICE),
        task("expedition_chronopost_plans", "Expédition chronopost (Plans)", Dispatch, Consultant, DEFAULT_PRICE),
        // Avis sur dossier ERP 5
        task("instruction_dossier_erp5", "Instruction de dossier de 5ème catégorie", General, Consultant, DEFAULT_PRICE),
        task("relecture_annotation_plans_architecte_erp5", "Relecture et annotation des plans d'architecte (ERP5)", General, Architect, DEFAULT_PRICE),
        // CSSI
        task("cssi_phase_conception", "CSSI Phase Conception", General, Consultant, DEFAULT_PRICE),
        task("cssi_phase_realisation", "CSSI Phase Réalisation", General, Consultant, DEFAULT_PRICE),
        task("cssi_phase_reception", "CSSI Phase Réception", General, Consultant, DEFAULT_PRICE),
        // Maintenance
        task("deplacement_technicien_maint", "Déplacement technicien (Maintenance)", Travel, Maintenance, TRAVEL_PRICE),
        task("maintenance_annuelle_alarme", "Maintenance annuelle équipement d'alarme", General, Maintenance, MAINTENANCE_PRICE),
        task("maintenance_annuelle_ria", "Maintenance annuelle RIA", General, Maintenance, MAINTENANCE_PRICE),
        task("maintenance_annuelle_extincteur", "Maintenance annuelle Extincteur", General, Maintenance, MAINTENANCE_PRICE),
        task("maintenance_annuelle_eclairage", "Maintenance annuelle éclairage de sécurité", General, Maintenance, MAINTENANCE_PRICE),
        task("maintenance_annuelle_poteaux", "Maintenance annuelle poteaux et bouche", General, Maintenance, MAINTENANCE_PRICE),
    ]
}

fn standard_services() -> Vec<Service> {
    vec![
        Service {
            id: "at",
            name: "AT (Autorisation de Travaux)",
            task_ids: vec![
                "deplacement_architecte_at",
                "releve_geometrique_at",
                "realisation_plans_existant_at",
                "realisation_plans_projet_at",
                "redaction_notice_securite_at",
                "redaction_notice_accessibilite_at",
                "redaction_demande_derogation_at",
                "renseignement_formulaire_cerfa_at",
                "impression_dossier_at",
                "expedition_courrier_recommande_at",
                "deplacement_preventionniste_at",
                "relecture_annotation_plans_architecte_at",
            ],
        },
        Service {
            id: "amo",
            name: "AMO (Assistance à Maîtrise d'Ouvrage)",
            task_ids: vec![
                "redaction_notice_securite_amo",
                "redaction_notice_accessibilite_amo",
                "redaction_demande_derogation_amo",
                "relecture_annotation_plans_architecte_amo",
            ],
        },
        Service {
            id: "dp",
            name: "DP (Déclaration Préalable)",
            task_ids: vec![
                "deplacement_architecte_dp",
                "releve_geometrique_dp",
                "realisation_plans_existant_dp",
                "realisation_plans_projet_dp",
                "renseignement_formulaire_cerfa_dp",
                "impression_dossier_dp",
                "expedition_courrier_recommande_dp",
                "realisation_reportage_photographique_dp",
                "realisation_photomontage_dp",
            ],
        },
        Service {
            id: "enseigne",
            name: "Demande d'enseigne",
            task_ids: vec![
                "deplacement_architecte_enseigne",
                "releve_geometrique_enseigne",
                "realisation_plans_existant_enseigne",
                "renseignement_formulaire_cerfa_enseigne",
                "impression_dossier_enseigne",
                "expedition_courrier_recommande_enseigne",
                "realisation_photomontage_enseigne",
            ],
        },
        Service {
            id: "audit_securite",
            name: "Audit sécurité",
            task_ids: vec![
                "deplacement_preventionniste_audit_sec",
                "redaction_rapport_audit_sec",
                "visite_audit_sec",
                "assistance_commission_securite_audit_sec",
            ],
        },
        Service {
            id: "audit_accessibilite",
            name: "Audit accessibilité",
            task_ids: vec![
                "deplacement_preventionniste_audit_acc",
                "redaction_rapport_audit_acc",
                "visite_audit_acc",
            ],
        },
        Service {
            id: "rus",
            name: "RUS (Registre Unique de Sécurité)",
            task_ids: vec![
                "deplacement_preventionniste_rus",
                "suivi_administratif_annuel_rus",
                "visite_audit_rus",
                "responsabilite_juridique_rus",
                "visa_rus",
            ],
        },
        Service {
            id: "suivi_etablissement",
            name: "Suivi d'établissement",
            task_ids: vec![
                "deplacement_preventionniste_suivi",
                "suivi_administratif_annuel_suivi",
                "visite_audit_suivi",
                "assistance_commission_securite_suivi",
            ],
        },
        Service {
            id: "plans_secours",
            name: "Plans de secours",
            task_ids: vec![
                "deplacement_architecte_plans",
                "releve_geometrique_plans",
                "realisation_plans_existant_plans",
                "realisation_plan_intervention",
                "realisation_plan_evacuation",
                "realisation_plan_chambre",
                "fourniture_cadres_clic_clac",
                "impression_plans",
                "expedition_chronopost_plans",
            ],
        },
        Service {
            id: "avis_erp5",
            name: "Avis sur dossier ERP 5",
            task_ids: vec![
                "instruction_dossier_erp5",
                "relecture_annotation_plans_architecte_erp5",
            ],
        },
        Service {
            id: "cssi",
            name: "CSSI Coordination SSI",
            task_ids: vec![
                "cssi_phase_conception",
                "cssi_phase_realisation",
                "cssi_phase_reception",
            ],
        },
        Service {
            id: "maintenance",
            name: "Maintenance Moyen de secours",
            task_ids: vec![
                "deplacement_technicien_maint",
                "maintenance_annuelle_alarme",
                "maintenance_annuelle_ria",
                "maintenance_annuelle_extincteur",
                "maintenance_annuelle_eclairage",
                "maintenance_annuelle_poteaux",
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_service_task_exists_in_catalog() {
        let catalog = Catalog::standard();
        for service in catalog.services() {
            for id in &service.task_ids {
                assert!(catalog.task(id).is_some(), "{id} missing from catalog");
            }
        }
    }

    #[test]
    fn every_task_is_owned_by_exactly_one_service() {
        let catalog = Catalog::standard();
        for task in catalog.tasks() {
            let owners = catalog
                .services()
                .iter()
                .filter(|service| service.contains(task.id))
                .count();
            assert_eq!(owners, 1, "{} owned by {owners} services", task.id);
        }
    }

    #[test]
    fn expand_selection_appends_service_tasks_without_duplicates() {
        let catalog = Catalog::standard();

        let selection = catalog.expand_selection(&["visa_rus", "nope"], &["rus", "unknown"]);

        assert_eq!(selection[0], "visa_rus");
        assert_eq!(selection[1], "nope");
        assert_eq!(selection.len(), 2 + 4);
        assert_eq!(
            selection.iter().filter(|id| id.as_str() == "visa_rus").count(),
            1
        );
    }
}
