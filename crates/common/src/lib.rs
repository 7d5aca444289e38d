//! Types shared by every bookfair service.
//!
//! Anything that crosses a service boundary lives here: identifiers,
//! roles, money, the JSON response envelope and JWT handling.

pub mod ids;
pub mod jwt;
pub mod money;
pub mod response;
pub mod role;

pub use ids::{StallId, UserId};
pub use jwt::{Claims, JwtConfig, JwtError, JwtService};
pub use money::Money;
pub use response::ApiResponse;
pub use role::{Role, RoleParseError};
