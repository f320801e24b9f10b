pub mod employee;
pub mod form;
pub mod user;

pub use employee::EmployeeRow;
pub use form::{assemble_templates, FormFieldRow, FormTemplateRow};
pub use user::{ProfileChanges, User, UserCredentials, UserDraft, UserProfile};
