pub mod department;
pub mod hospital;
pub mod patient;
pub mod queue;
pub mod staff;

pub use department::{unify_department_options, DepartmentOption};
pub use hospital::Hospital;
pub use patient::Patient;
pub use queue::{CallNextResponse, QueueSnapshot, QueueStatus, ServerRecord};
pub use staff::StaffProfile;
