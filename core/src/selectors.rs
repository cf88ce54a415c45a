use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque, stable reference to one interactive element of the portal.
/// Defined at configuration time; the sequencer never inspects the markup
/// beyond resolving these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldLocator(String);

impl FieldLocator {
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn as_css(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The portal's form fields on the project-times view. Defaults match the
/// deployed portal; all of them can be overridden through serde when the
/// portal markup shifts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalSelectors {
    pub project_input: FieldLocator,
    pub project_options: FieldLocator,
    pub project_loading: FieldLocator,
    pub registration_input: FieldLocator,
    pub registration_options: FieldLocator,
    pub registration_loading: FieldLocator,
    pub date_input: FieldLocator,
    pub duration_input: FieldLocator,
    pub comment_input: FieldLocator,
    pub submit_button: FieldLocator,
}

impl Default for PortalSelectors {
    fn default() -> Self {
        Self {
            project_input: FieldLocator::new("#ctl00_cphContent_cboProjects_I"),
            project_options: FieldLocator::new("#ctl00_cphContent_cboProjects_DDD_L_LBT > tbody > tr"),
            project_loading: FieldLocator::new("#ctl00_cphContent_cboProjects_LPV"),
            registration_input: FieldLocator::new("#ctl00_cphContent_cboPSItem_0_I"),
            registration_options: FieldLocator::new("#ctl00_cphContent_cboPSItem_0_DDD_L_LBT > tbody > tr"),
            registration_loading: FieldLocator::new("#ctl00_cphContent_cboPSItem_0_LPV"),
            date_input: FieldLocator::new("#ctl00_cphContent_deDate_I"),
            duration_input: FieldLocator::new("#ctl00_cphContent_teDuration_I"),
            comment_input: FieldLocator::new("#ctl00_cphContent_memComment_I"),
            submit_button: FieldLocator::new("#ctl00_cphContent_btnSave"),
        }
    }
}
