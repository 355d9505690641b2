//! Client-side state: the session store and the route guard derived from it.

pub mod guard;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;
