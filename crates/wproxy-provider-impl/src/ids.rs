use rand::Rng;
use rand::distr::Alphanumeric;

/// Random ASCII alphanumeric string of `len` characters.
pub fn alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Widget client id sent with every chat call.
pub fn client_id() -> String {
    alphanumeric(10)
}

/// Five-digit id used for chat sessions and assistant history entries.
pub fn chat_id() -> u32 {
    rand::rng().random_range(10_000..100_000)
}

pub fn completion_id() -> String {
    format!("chatcmpl-{}", alphanumeric(29))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_have_expected_shape() {
        let client = client_id();
        assert_eq!(client.len(), 10);
        assert!(client.chars().all(|c| c.is_ascii_alphanumeric()));

        let chat = chat_id();
        assert!((10_000..100_000).contains(&chat));

        let completion = completion_id();
        assert!(completion.starts_with("chatcmpl-"));
        assert_eq!(completion.len(), "chatcmpl-".len() + 29);
    }
}
