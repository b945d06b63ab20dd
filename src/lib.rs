pub mod form;
pub mod login;
pub mod prelude;

pub use login::{LoginForm, LoginValues, SimulatedLoginService};
