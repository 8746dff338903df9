pub mod gemini;
pub mod llm;
pub mod ollama;

#[cfg(test)]
pub(crate) mod test_provider;
