/// Instruction prompt for a blog post on `topic`, in Llama's `[INST]` format.
/// The topic is embedded verbatim.
pub fn build_blog_prompt(topic: &str) -> String {
    format!("<s>[INST]Human: Write a 200 words blog on {topic}.\n    Assistant:[/INST]\n    ")
}
