// ---------------------------------------------------------------------------
// Bundled CVE dataset
// ---------------------------------------------------------------------------
//
// A curated set of high-impact CVEs for common internet-facing services.
// This gives vulnerability matching something to work with out of the box,
// without requiring a feed subscription or network access.

use threatwatch_types::CveEntry;

use crate::error::DbError;
use crate::store::Store;

/// Current bundled data version. Bump when adding/changing entries.
const BUNDLED_VERSION: &str = "1";

/// Seed the database with bundled CVEs (idempotent).
pub fn seed_bundled_cves(store: &Store) -> Result<(), DbError> {
    // Check if already seeded with this version
    if let Some(ver) = store.get_cve_metadata("bundled_version")? {
        if ver == BUNDLED_VERSION {
            return Ok(());
        }
    }

    store.bulk_import_cves(&bundled_entries())?;
    store.set_cve_metadata("bundled_version", BUNDLED_VERSION)?;

    Ok(())
}

/// Return the bundled CVE dataset.
pub fn bundled_entries() -> Vec<CveEntry> {
    vec![
        // -------------------------------------------------------------------
        // OpenSSH
        // -------------------------------------------------------------------
        cve(
            "CVE-2024-6387",
            8.1,
            "OpenSSH signal handler race condition (regreSSHion). \
             Unauthenticated remote code execution on glibc-based Linux systems.",
            "2024-07-01",
        ),
        cve(
            "CVE-2023-38408",
            9.8,
            "OpenSSH ssh-agent remote code execution via forwarded agent socket.",
            "2023-07-20",
        ),
        // -------------------------------------------------------------------
        // Apache HTTP Server
        // -------------------------------------------------------------------
        cve(
            "CVE-2023-25690",
            9.8,
            "Apache HTTP Server mod_proxy HTTP request smuggling vulnerability.",
            "2023-03-07",
        ),
        cve(
            "CVE-2021-41773",
            7.5,
            "Apache HTTP Server 2.4.49 path traversal and file disclosure.",
            "2021-10-05",
        ),
        // -------------------------------------------------------------------
        // nginx
        // -------------------------------------------------------------------
        cve(
            "CVE-2022-41741",
            7.8,
            "nginx mp4 module memory corruption allows code execution.",
            "2022-10-19",
        ),
        cve(
            "CVE-2021-23017",
            7.7,
            "nginx resolver off-by-one heap write allows remote code execution.",
            "2021-05-25",
        ),
        // -------------------------------------------------------------------
        // FTP / Telnet
        // -------------------------------------------------------------------
        cve(
            "CVE-2021-3226",
            7.5,
            "vsftpd FTP server denial of service via crafted commands.",
            "2021-06-01",
        ),
        cve(
            "CVE-2020-10188",
            9.8,
            "netkit telnetd remote code execution via short writes (Telnet BSD client).",
            "2020-03-06",
        ),
        // -------------------------------------------------------------------
        // Databases
        // -------------------------------------------------------------------
        cve(
            "CVE-2023-21980",
            7.1,
            "MySQL Server client program vulnerability allows takeover of the client.",
            "2023-04-18",
        ),
        cve(
            "CVE-2024-0985",
            8.0,
            "PostgreSQL REFRESH MATERIALIZED VIEW CONCURRENTLY executes arbitrary SQL \
             as the materialized view owner.",
            "2024-02-08",
        ),
        cve(
            "CVE-2023-21528",
            7.8,
            "Microsoft SQL Server (MSSQL) remote code execution vulnerability.",
            "2023-02-14",
        ),
        // -------------------------------------------------------------------
        // RDP
        // -------------------------------------------------------------------
        cve(
            "CVE-2019-0708",
            9.8,
            "Remote Desktop Services (RDP, BlueKeep) pre-auth remote code execution.",
            "2019-05-14",
        ),
        // -------------------------------------------------------------------
        // TLS stacks
        // -------------------------------------------------------------------
        cve(
            "CVE-2022-3602",
            7.5,
            "OpenSSL X.509 email address punycode buffer overflow during \
             certificate verification.",
            "2022-11-01",
        ),
        cve(
            "CVE-2021-3449",
            5.9,
            "OpenSSL NULL pointer dereference in signature_algorithms processing \
             crashes TLS servers.",
            "2021-03-25",
        ),
    ]
}

fn cve(id: &str, cvss: f64, description: &str, published: &str) -> CveEntry {
    CveEntry {
        cve_id: id.to_string(),
        cvss_score: Some(cvss),
        description: description.to_string(),
        published_date: Some(published.to_string()),
        reference_url: Some(format!("https://nvd.nist.gov/vuln/detail/{id}")),
        source: "bundled".to_string(),
    }
}
