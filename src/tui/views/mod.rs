pub mod book_form;
pub mod catalog;
pub mod exchange_dialog;
pub mod requests;
pub mod shelf;
