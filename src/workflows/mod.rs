pub mod leads;
pub mod opportunities;

pub use leads::{LeadDraft, LeadWorkflow};
pub use opportunities::{OpportunityDraft, OpportunityWorkflow};
