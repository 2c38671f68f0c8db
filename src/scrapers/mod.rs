//! Scrapers for stockwatch.pl.
//!
//! | Module | Page | Produces |
//! |--------|------|----------|
//! | [`reports`] | `/gpw/{name},komunikaty,wskazniki.aspx` | [`Report`](crate::models::Report) |
//! | [`news`] | `/wiadomosci/walor/{ticker}?page={n}` | [`ArticleListing`](crate::models::ArticleListing) |
//! | [`article`] | article pages linked from [`news`] | [`Article`](crate::models::Article) |
//!
//! All of them fetch through [`client::PageSource`], strictly one request at a
//! time. A failed fetch is logged and affects only the unit being fetched
//! (one company listing, one news page, one article); nothing is retried.

pub mod article;
pub mod client;
pub mod news;
pub mod reports;
