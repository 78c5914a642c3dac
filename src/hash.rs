use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Compute the hex-encoded SHA-256 digest of a byte stream.
///
/// Reads in fixed-size chunks so arbitrarily large input never has to sit in
/// memory at once. The reader is consumed to completion; an IO error aborts
/// the digest rather than producing a partial result.
pub async fn digest_reader<R>(mut reader: R) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_digest() {
        let digest = digest_reader(&b"hello"[..]).await.unwrap();
        assert_eq!(
            digest,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[tokio::test]
    async fn test_empty_input() {
        let digest = digest_reader(&b""[..]).await.unwrap();
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_chunk_boundaries_do_not_matter() {
        // A chained reader stops at each segment boundary, forcing different
        // read sizes than the contiguous slice
        let chunked = (&b"he"[..]).chain(&b"ll"[..]).chain(&b"o"[..]);
        let whole = digest_reader(&b"hello"[..]).await.unwrap();
        assert_eq!(digest_reader(chunked).await.unwrap(), whole);
    }

    #[tokio::test]
    async fn test_input_larger_than_read_buffer() {
        let data = vec![0xabu8; 50_000];
        let digest = digest_reader(&data[..]).await.unwrap();
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, digest_reader(&data[..]).await.unwrap());
    }
}
