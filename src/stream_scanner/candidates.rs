//! Candidate generation
//!
//! Priority bands:
//! - 1000 known-good URL for this IP
//! - 900  ONVIF discovery endpoints
//! - 700-800 vendor RTSP paths
//! - 560-600 standard RTSP ports/paths with credentials, DVR libraries
//! - 500  proprietary protocol wrappers
//! - 380-420 HTTP MJPEG / snapshot
//! - 260-300 standard RTSP without credentials
//! - 195-210 RTMP
//! - 100  ffmpeg-wrapped fallbacks

use super::types::{Candidate, CandidateProtocol};
use super::utils::{expand_template, userinfo};
use super::vendor_paths::{
    fill_credentials, DVR_RTSP_PATHS, GENERIC_RTSP_PATHS, GENERIC_RTSP_PORTS, HTTP_PATHS,
    QUICK_SCAN_PATHS, RTMP_PATHS, VENDOR_RTSP_PATHS,
};
use std::collections::HashMap;
use std::net::Ipv4Addr;

pub const PRIORITY_KNOWN: i32 = 1000;
pub const PRIORITY_ONVIF: i32 = 900;
pub const PRIORITY_RTSP_CREDENTIALS: i32 = 600;
pub const PRIORITY_PROPRIETARY: i32 = 500;
pub const PRIORITY_RTSP_OPEN: i32 = 300;
pub const PRIORITY_FFMPEG: i32 = 100;

/// ONVIF service ports, most common first
const ONVIF_PORTS: &[u16] = &[80, 2020, 8000, 8080, 8899];

/// How many top RTSP candidates also get an ffmpeg-wrapped variant
const FFMPEG_WRAP_COUNT: usize = 5;

/// Full candidate set for one camera, deduplicated and sorted
pub fn generate_candidates(
    ip: Ipv4Addr,
    user: &str,
    pass: &str,
    known_template: Option<&str>,
) -> Vec<Candidate> {
    let auth = userinfo(user, pass);
    let enc_user = urlencoding::encode(user).into_owned();
    let enc_pass = urlencoding::encode(pass).into_owned();
    let mut out = Vec::new();

    if let Some(template) = known_template {
        out.push(Candidate::new(
            expand_template(template, ip, user, pass),
            CandidateProtocol::from_url(template),
            "Known working stream",
            PRIORITY_KNOWN,
        ));
    }

    for (i, port) in ONVIF_PORTS.iter().enumerate() {
        out.push(Candidate::new(
            format!("onvif://{}{}:{}", auth, ip, port),
            CandidateProtocol::Onvif,
            format!("ONVIF discovery on port {}", port),
            PRIORITY_ONVIF - i as i32,
        ));
    }

    for vendor in VENDOR_RTSP_PATHS {
        out.push(Candidate::new(
            format!(
                "rtsp://{}{}:{}{}",
                auth,
                ip,
                vendor.port,
                fill_credentials(vendor.path, &enc_user, &enc_pass)
            ),
            CandidateProtocol::Rtsp,
            format!("{} RTSP", vendor.vendor),
            vendor.priority,
        ));
    }

    for (pi, port) in GENERIC_RTSP_PORTS.iter().enumerate() {
        for (i, path) in GENERIC_RTSP_PATHS.iter().enumerate() {
            let offset = (pi * 20 + i) as i32;
            out.push(Candidate::new(
                format!("rtsp://{}{}:{}{}", auth, ip, port, path),
                CandidateProtocol::Rtsp,
                format!("Standard RTSP {} on port {}", path, port),
                PRIORITY_RTSP_CREDENTIALS - offset,
            ));
            out.push(Candidate::new(
                format!("rtsp://{}:{}{}", ip, port, path),
                CandidateProtocol::Rtsp,
                format!("Unauthenticated RTSP {} on port {}", path, port),
                PRIORITY_RTSP_OPEN - offset,
            ));
        }
    }

    for dvr in DVR_RTSP_PATHS {
        out.push(Candidate::new(
            format!(
                "rtsp://{}{}:{}{}",
                auth,
                ip,
                dvr.port,
                fill_credentials(dvr.path, &enc_user, &enc_pass)
            ),
            CandidateProtocol::Rtsp,
            format!("{} RTSP", dvr.vendor),
            dvr.priority,
        ));
    }

    out.extend(proprietary_candidates(ip, &auth, &enc_pass));

    for http in HTTP_PATHS {
        out.push(Candidate::new(
            format!(
                "http://{}{}:{}{}",
                auth,
                ip,
                http.port,
                fill_credentials(http.path, &enc_user, &enc_pass)
            ),
            CandidateProtocol::Http,
            format!("{} HTTP", http.vendor),
            http.priority,
        ));
    }

    for rtmp in RTMP_PATHS {
        out.push(Candidate::new(
            format!(
                "rtmp://{}:{}{}",
                ip,
                rtmp.port,
                fill_credentials(rtmp.path, &enc_user, &enc_pass)
            ),
            CandidateProtocol::Rtmp,
            format!("{} RTMP", rtmp.vendor),
            rtmp.priority,
        ));
    }

    let mut out = finalize(out);

    let wrapped: Vec<Candidate> = out
        .iter()
        .filter(|c| c.protocol == CandidateProtocol::Rtsp && c.priority < PRIORITY_ONVIF)
        .take(FFMPEG_WRAP_COUNT)
        .map(|c| {
            Candidate::new(
                format!("ffmpeg:{}#video=h264", c.url),
                CandidateProtocol::Ffmpeg,
                format!("FFmpeg transcode of {}", c.description),
                PRIORITY_FFMPEG,
            )
        })
        .collect();
    out.extend(wrapped);

    out
}

fn proprietary_candidates(ip: Ipv4Addr, auth: &str, enc_pass: &str) -> Vec<Candidate> {
    let mut out = Vec::new();
    if !enc_pass.is_empty() {
        out.push(Candidate::new(
            format!("tapo://{}@{}", enc_pass, ip),
            CandidateProtocol::Tapo,
            "TP-Link Tapo (password only)",
            PRIORITY_PROPRIETARY,
        ));
    }
    out.push(Candidate::new(
        format!("dvrip://{}{}:34567", auth, ip),
        CandidateProtocol::Dvrip,
        "Xiongmai DVRIP",
        PRIORITY_PROPRIETARY,
    ));
    out.push(Candidate::new(
        format!("bubble://{}{}:80/bubble/live?ch=0&stream=0", auth, ip),
        CandidateProtocol::Bubble,
        "Bubble DVR",
        PRIORITY_PROPRIETARY,
    ));
    out
}

/// Curated quick-scan list, in trial order
pub fn quick_candidates(
    ip: Ipv4Addr,
    user: &str,
    pass: &str,
    known_template: Option<&str>,
) -> Vec<Candidate> {
    let auth = userinfo(user, pass);
    let mut out = Vec::new();

    if let Some(template) = known_template {
        out.push(Candidate::new(
            expand_template(template, ip, user, pass),
            CandidateProtocol::from_url(template),
            "Known working stream",
            PRIORITY_KNOWN,
        ));
    }

    let count = QUICK_SCAN_PATHS.len() as i32;
    for (i, (port, path)) in QUICK_SCAN_PATHS.iter().enumerate() {
        let url = format!("rtsp://{}{}:{}{}", auth, ip, port, path);
        if out.iter().any(|c: &Candidate| c.url == url) {
            continue;
        }
        out.push(Candidate::new(
            url,
            CandidateProtocol::Rtsp,
            format!("Quick scan {}", path),
            PRIORITY_RTSP_CREDENTIALS + (count - i as i32),
        ));
    }

    out
}

/// Collapse duplicate URLs (highest priority wins) and sort by priority, descending
pub fn finalize(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<Candidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match index.get(&candidate.url) {
            Some(&i) => {
                if candidate.priority > out[i].priority {
                    out[i] = candidate;
                }
            }
            None => {
                index.insert(candidate.url.clone(), out.len());
                out.push(candidate);
            }
        }
    }

    out.sort_by(|a, b| b.priority.cmp(&a.priority));
    out
}
