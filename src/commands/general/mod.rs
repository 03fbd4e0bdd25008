pub(crate) mod help;
