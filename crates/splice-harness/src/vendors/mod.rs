/// OpenAI-compatible completion servers (`mlx_lm.server`, `llama-server`, vLLM).
pub mod openai;
