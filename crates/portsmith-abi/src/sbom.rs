//! SPDX 2.2 SBOM emission (`spec.md` §4.2.4, §2.2's supplemented feature):
//! referencing the port's sources and any fetched resource archives by
//! sha-512.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One file the SBOM references by its SHA-512 checksum.
#[derive(Debug, Clone, Serialize)]
pub struct SbomFile {
    /// Relative path within the package (portfile) or a descriptive name
    /// (a fetched archive).
    #[serde(rename = "fileName")]
    pub file_name: String,
    /// Lowercase-hex SHA-512 digest.
    pub sha512: String,
}

#[derive(Debug, Serialize)]
struct SpdxChecksum<'a> {
    algorithm: &'static str,
    #[serde(rename = "checksumValue")]
    checksum_value: &'a str,
}

#[derive(Debug, Serialize)]
struct SpdxFile<'a> {
    #[serde(rename = "fileName")]
    file_name: &'a str,
    #[serde(rename = "SPDXID")]
    spdx_id: String,
    checksums: Vec<SpdxChecksum<'a>>,
}

#[derive(Debug, Serialize)]
struct SpdxPackage<'a> {
    name: &'a str,
    #[serde(rename = "SPDXID")]
    spdx_id: &'static str,
    #[serde(rename = "versionInfo")]
    version_info: &'a str,
    #[serde(rename = "licenseConcluded")]
    license_concluded: &'a str,
    #[serde(rename = "downloadLocation")]
    download_location: &'static str,
    #[serde(rename = "hasFiles")]
    has_files: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SpdxCreationInfo {
    creators: Vec<String>,
    created: String,
}

#[derive(Debug, Serialize)]
struct SpdxDocument<'a> {
    #[serde(rename = "spdxVersion")]
    spdx_version: &'static str,
    #[serde(rename = "dataLicense")]
    data_license: &'static str,
    #[serde(rename = "SPDXID")]
    spdx_id: &'static str,
    name: &'a str,
    #[serde(rename = "documentNamespace")]
    document_namespace: String,
    #[serde(rename = "creationInfo")]
    creation_info: SpdxCreationInfo,
    packages: Vec<SpdxPackage<'a>>,
    files: Vec<SpdxFile<'a>>,
}

/// Render an SPDX 2.2 SBOM JSON document for one package, referencing its
/// port sources and any fetched resource archives by sha-512.
#[must_use]
pub fn render_sbom(
    package_name: &str,
    version_text: &str,
    license: Option<&str>,
    files: &[SbomFile],
    created_at: DateTime<Utc>,
) -> String {
    let spdx_files: Vec<SpdxFile> = files
        .iter()
        .enumerate()
        .map(|(i, f)| SpdxFile {
            file_name: &f.file_name,
            spdx_id: format!("SPDXRef-File-{i}"),
            checksums: vec![SpdxChecksum { algorithm: "SHA512", checksum_value: &f.sha512 }],
        })
        .collect();

    let document = SpdxDocument {
        spdx_version: "SPDX-2.2",
        data_license: "CC0-1.0",
        spdx_id: "SPDXRef-DOCUMENT",
        name: package_name,
        document_namespace: format!("https://portsmith.invalid/spdx/{package_name}-{version_text}"),
        creation_info: SpdxCreationInfo {
            creators: vec!["Tool: portsmith-abi".to_string()],
            created: created_at.to_rfc3339(),
        },
        packages: vec![SpdxPackage {
            name: package_name,
            spdx_id: "SPDXRef-Package",
            version_info: version_text,
            license_concluded: license.unwrap_or("NOASSERTION"),
            download_location: "NOASSERTION",
            has_files: spdx_files.iter().map(|f| f.spdx_id.clone()).collect(),
        }],
        files: spdx_files,
    };

    serde_json::to_string_pretty(&document).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_every_file_by_its_checksum() {
        let files = vec![
            SbomFile { file_name: "portfile.cmake".to_string(), sha512: "aa".to_string() },
            SbomFile { file_name: "vcpkg.json".to_string(), sha512: "bb".to_string() },
        ];
        let text = render_sbom("zlib", "1.2", Some("Zlib"), &files, Utc::now());
        assert!(text.contains("\"SHA512\""));
        assert!(text.contains("portfile.cmake"));
        assert!(text.contains("\"Zlib\""));
    }
}
