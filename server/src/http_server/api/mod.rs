pub(crate) mod auth;
pub(crate) mod favorites;
pub(crate) mod ingredients;
pub(crate) mod recipes;
pub(crate) mod shopping_cart;
pub(crate) mod tags;
pub(crate) mod users;
