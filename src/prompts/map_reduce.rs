//! Map-reduce summarization prompts.
//!
//! The map prompt condenses one chunk; the reduce prompt merges all partial
//! summaries. Both ask for Portuguese output.

/// Upper bound on bullets per partial summary
pub const MAX_BULLETS: usize = 5;

/// Map prompt template
/// Placeholders: {max_bullets}, {context}
pub const MAP_PROMPT_TEMPLATE: &str = "Você é um assistente especialista em sumarização.
Resuma o trecho abaixo em até {max_bullets} bullets curtos, mantendo fatos principais.

Trecho:
{context}";

/// Reduce prompt template
/// Placeholders: {summaries}
pub const REDUCE_PROMPT_TEMPLATE: &str = "Você recebeu resumos parciais de um documento longo.
Gere um resumo final em português com:
1) visão geral (2-3 frases)
2) principais pontos em bullets
3) próximos passos sugeridos (opcional)

Resumos parciais:
{summaries}";

/// Build the map prompt for one chunk
pub fn build_map_prompt(chunk_text: &str) -> String {
    MAP_PROMPT_TEMPLATE
        .replace("{max_bullets}", &MAX_BULLETS.to_string())
        .replace("{context}", chunk_text)
}

/// Build the reduce prompt from partial summaries already in chunk order
pub fn build_reduce_prompt<S: AsRef<str>>(summaries: &[S]) -> String {
    let total = summaries.len();
    let body = summaries
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[Parte {}/{}]\n{}", i + 1, total, s.as_ref().trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    REDUCE_PROMPT_TEMPLATE.replace("{summaries}", &body)
}
