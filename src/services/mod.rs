pub mod pipeline;
pub mod visibility;
pub mod activity_service;
pub use activity_service::ActivityService;
pub mod assignment_service;
pub use assignment_service::AssignmentService;
pub mod client_service;
pub use client_service::{ClientQuery, ClientService};
pub mod followup_service;
pub use followup_service::{FollowupService, TaskOutcome};
pub mod dashboard_service;
pub use dashboard_service::DashboardService;
