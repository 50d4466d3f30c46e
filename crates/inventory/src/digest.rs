use async_trait::async_trait;
use bollard::Docker;
use vuln_scan::features::scan_image::{DigestResolver, ScanError};

/// Resolves a container's effective image digest straight off the engine,
/// grounded in the scan procedure's digest-resolution step (§4.D.3):
/// read the image's repo digests and pull out the `sha256:...` portion,
/// falling back to the local image id when no repo digest is recorded
/// (locally-built or untagged images).
pub struct BollardDigestResolver {
    docker: Docker,
}

impl BollardDigestResolver {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }
}

#[async_trait]
impl DigestResolver for BollardDigestResolver {
    async fn resolve_digest(&self, image_reference: &str) -> Result<String, ScanError> {
        let image = self
            .docker
            .inspect_image(image_reference)
            .await
            .map_err(|e| ScanError::DigestResolution(e.to_string()))?;

        if let Some(repo_digests) = &image.repo_digests {
            for entry in repo_digests {
                if let Some((_, digest)) = entry.rsplit_once('@') {
                    if digest.starts_with("sha256:") {
                        return Ok(digest.to_string());
                    }
                }
            }
        }

        image.id.ok_or_else(|| ScanError::DigestResolution(format!("no digest or image id for {image_reference}")))
    }
}
