//! Extraction from the optional, human-authored master plan markdown.
//!
//! Sections are located by `## HEADING` lines and items by regex. Nothing
//! here fails: an unexpected layout yields empty lists, which the
//! markdown generator renders as "not found".

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasterPlan {
    pub sections: Vec<Section>,
}

static HEADING_RE: OnceLock<Regex> = OnceLock::new();
static FORM_TOKEN_RE: OnceLock<Regex> = OnceLock::new();
static LIST_ITEM_RE: OnceLock<Regex> = OnceLock::new();
static IDENT_RE: OnceLock<Regex> = OnceLock::new();
static SECTION_RES: OnceLock<SectionRes> = OnceLock::new();

struct SectionRes {
    forms: Regex,
    procedures: Regex,
    classes: Regex,
    endpoints: Regex,
    features: Regex,
}

fn heading_re() -> &'static Regex {
    HEADING_RE.get_or_init(|| Regex::new(r"^##[ \t]+([^#].*?)[ \t#]*$").unwrap())
}

fn form_token_re() -> &'static Regex {
    FORM_TOKEN_RE.get_or_init(|| Regex::new(r"\bfrm[A-Za-z0-9_]+\b").unwrap())
}

fn list_item_re() -> &'static Regex {
    LIST_ITEM_RE.get_or_init(|| {
        Regex::new(r"^\s*(?:[-*+]|\d+\.)\s+(?:\[[ xX]\]\s+)?(.+?)\s*$").unwrap()
    })
}

fn ident_re() -> &'static Regex {
    IDENT_RE.get_or_init(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_.]*").unwrap())
}

fn section_res() -> &'static SectionRes {
    SECTION_RES.get_or_init(|| SectionRes {
        forms: Regex::new(r"(?i)^forms?\s+to\s+convert").unwrap(),
        procedures: Regex::new(r"(?i)^(stored\s+)?procedures").unwrap(),
        classes: Regex::new(r"(?i)^(classes|business\s+objects)").unwrap(),
        endpoints: Regex::new(r"(?i)^(api\s+)?endpoints").unwrap(),
        features: Regex::new(r"(?i)^features").unwrap(),
    })
}

/// The sections gap analysis reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSection {
    Forms,
    Procedures,
    Classes,
    Endpoints,
    Features,
}

impl PlanSection {
    pub const ALL: [PlanSection; 5] = [
        PlanSection::Forms,
        PlanSection::Procedures,
        PlanSection::Classes,
        PlanSection::Endpoints,
        PlanSection::Features,
    ];

    /// Canonical heading, as written in the plan template.
    pub fn heading(self) -> &'static str {
        match self {
            PlanSection::Forms => "FORMS TO CONVERT",
            PlanSection::Procedures => "STORED PROCEDURES",
            PlanSection::Classes => "CLASSES",
            PlanSection::Endpoints => "ENDPOINTS",
            PlanSection::Features => "FEATURES",
        }
    }

    fn heading_re(self) -> &'static Regex {
        let res = section_res();
        match self {
            PlanSection::Forms => &res.forms,
            PlanSection::Procedures => &res.procedures,
            PlanSection::Classes => &res.classes,
            PlanSection::Endpoints => &res.endpoints,
            PlanSection::Features => &res.features,
        }
    }
}

impl MasterPlan {
    pub fn parse(text: &str) -> Self {
        let mut sections = Vec::new();
        let mut current: Option<Section> = None;
        for line in text.lines() {
            if let Some(cap) = heading_re().captures(line) {
                if let Some(done) = current.take() {
                    sections.push(done);
                }
                current = Some(Section {
                    heading: cap[1].trim().to_string(),
                    body: String::new(),
                });
                continue;
            }
            if let Some(section) = current.as_mut() {
                section.body.push_str(line);
                section.body.push('\n');
            }
        }
        if let Some(done) = current {
            sections.push(done);
        }
        Self { sections }
    }

    /// Body of the first section whose heading matches `re`.
    pub fn section(&self, re: &Regex) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| re.is_match(&s.heading))
            .map(|s| s.body.as_str())
    }

    pub fn has_section(&self, kind: PlanSection) -> bool {
        self.section(kind.heading_re()).is_some()
    }

    /// Expected sections the plan does not contain, in catalogue order.
    pub fn missing_sections(&self) -> Vec<PlanSection> {
        PlanSection::ALL
            .iter()
            .copied()
            .filter(|k| !self.has_section(*k))
            .collect()
    }

    /// `frm*` tokens inside `## FORMS TO CONVERT`.
    pub fn forms(&self) -> Vec<String> {
        let Some(body) = self.section(&section_res().forms) else {
            return Vec::new();
        };
        dedup(
            form_token_re()
                .find_iter(body)
                .map(|m| m.as_str().to_string()),
        )
    }

    pub fn procedures(&self) -> Vec<String> {
        self.first_identifiers(&section_res().procedures)
    }

    pub fn classes(&self) -> Vec<String> {
        self.first_identifiers(&section_res().classes)
    }

    /// List items of `## ENDPOINTS`, e.g. `GET /Facility/Search`.
    pub fn endpoints(&self) -> Vec<String> {
        self.items(&section_res().endpoints)
            .into_iter()
            .map(|i| i.replace('`', ""))
            .collect()
    }

    /// List items of `## FEATURES`, trimmed at the first ` - ` or `:`.
    pub fn features(&self) -> Vec<String> {
        self.items(&section_res().features)
            .into_iter()
            .map(|i| {
                let cut = i.find(" - ").or_else(|| i.find(':')).unwrap_or(i.len());
                i[..cut].replace(['*', '`'], "").trim().to_string()
            })
            .filter(|i| !i.is_empty())
            .collect()
    }

    fn items(&self, heading: &Regex) -> Vec<String> {
        let Some(body) = self.section(heading) else {
            return Vec::new();
        };
        dedup(
            body.lines()
                .filter_map(|l| list_item_re().captures(l))
                .map(|c| c[1].to_string()),
        )
    }

    fn first_identifiers(&self, heading: &Regex) -> Vec<String> {
        dedup(
            self.items(heading)
                .iter()
                .filter_map(|i| ident_re().find(i).map(|m| m.as_str().to_string())),
        )
    }
}

fn dedup(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .filter(|i| seen.insert(i.to_ascii_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"# Facility master plan

Intro text.

## FORMS TO CONVERT

- frmFacilitySearch (search grid)
- frmFacilityDetail, opens frmLocationDetail
- frmFacilitySearch again

## Stored Procedures
1. `usp_Facility_Search` - search
2. usp_Facility_Save
* [x] usp_Facility_Delete

## Business Objects
- **Facility**
- FacilityList

## API Endpoints ##
- `GET /Facility/Search`
- POST /Facility/Save

## Features
- [ ] Export to Excel - the grid export button
- Audit history: view changes
"#;

    #[test]
    fn sections_are_split_on_level_two_headings() {
        let plan = MasterPlan::parse(PLAN);
        let headings: Vec<&str> = plan.sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(
            headings,
            vec![
                "FORMS TO CONVERT",
                "Stored Procedures",
                "Business Objects",
                "API Endpoints",
                "Features"
            ]
        );
    }

    #[test]
    fn extracts_items() {
        let plan = MasterPlan::parse(PLAN);
        assert_eq!(
            plan.forms(),
            vec!["frmFacilitySearch", "frmFacilityDetail", "frmLocationDetail"]
        );
        assert_eq!(
            plan.procedures(),
            vec![
                "usp_Facility_Search",
                "usp_Facility_Save",
                "usp_Facility_Delete"
            ]
        );
        assert_eq!(plan.classes(), vec!["Facility", "FacilityList"]);
        assert_eq!(
            plan.endpoints(),
            vec!["GET /Facility/Search", "POST /Facility/Save"]
        );
        assert_eq!(plan.features(), vec!["Export to Excel", "Audit history"]);
        assert!(plan.missing_sections().is_empty());
    }

    #[test]
    fn partial_plan_reports_missing_headings() {
        let plan = MasterPlan::parse("## Forms to convert\n- frmBarge\n\n## Classes\n- Barge\n");
        assert!(plan.has_section(PlanSection::Forms));
        assert_eq!(
            plan.missing_sections(),
            vec![
                PlanSection::Procedures,
                PlanSection::Endpoints,
                PlanSection::Features
            ]
        );
    }

    #[test]
    fn unexpected_layout_degrades_to_empty() {
        let plan = MasterPlan::parse("Just prose, no headings. frmSomething mentioned.");
        assert!(plan.sections.is_empty());
        assert_eq!(plan.missing_sections(), PlanSection::ALL.to_vec());
        assert!(plan.forms().is_empty());
        assert!(plan.procedures().is_empty());
        assert!(plan.features().is_empty());
    }
}
