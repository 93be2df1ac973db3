//! Business-logic services over the row store. The progression engine owns
//! completion semantics; everything else users do to their items lives here.

pub mod admin;
pub mod items;
