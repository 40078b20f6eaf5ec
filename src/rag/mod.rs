//! RAG (Retrieval-Augmented Generation) for question answering with citations.
//!
//! [`Retriever`] pulls the most relevant chunks from the index and
//! [`AnswerSynthesizer`] turns them into a validated [`StructuredAnswer`].

mod openai;
pub mod retriever;
pub mod synthesizer;

pub use openai::OpenAIAnswerModel;
pub use retriever::{join_context, Retriever};
pub use synthesizer::{
    answer_schema, wants_elaboration, AnswerModel, AnswerRequest, AnswerSynthesizer,
    StructuredAnswer, ELABORATION_CUES, FALLBACK_ANSWER,
};
