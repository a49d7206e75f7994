//! # iNat Query
//!
//! Parser for the natural-language taxon query grammar used by chat front ends:
//!
//! ```text
//! <subject terms> [in <ancestor terms>] [by <user>] [from <place>]
//! ```
//!
//! - Double-quoted phrases stay together and must later match a name exactly.
//! - Rank keywords (`family`, `sp`, ...) are kept as terms and recorded as rank filters.
//! - All-digit terms are taxon ids; four-capital terms are bird banding codes.
//!
//! ## Example
//!
//! ```
//! use inat_query::{Clause, CompoundQuery};
//! use inat_protocol::Rank;
//!
//! let query = CompoundQuery::parse("\"bear\" family in animals").unwrap();
//! assert_eq!(query.subject.len(), 2);
//! assert_eq!(query.ranks(Clause::Subject), vec![Rank::Family]);
//! assert_eq!(query.ancestor[0].text, "animals");
//! ```

mod compound;
mod error;
mod tokenizer;

pub use compound::{Clause, CompoundQuery, RankFilter, TaxonQuery, Term};
pub use error::{QueryError, Result};
pub use tokenizer::{tokenize, Token};
