//! Stream path libraries
//!
//! Paths may contain `{user}` / `{pass}` placeholders for vendors that take
//! credentials in the path instead of the userinfo part.

/// One vendor-specific stream location
#[derive(Debug, Clone, Copy)]
pub struct VendorPath {
    pub vendor: &'static str,
    pub port: u16,
    pub path: &'static str,
    pub priority: i32,
}

const fn vp(vendor: &'static str, port: u16, path: &'static str, priority: i32) -> VendorPath {
    VendorPath {
        vendor,
        port,
        path,
        priority,
    }
}

/// Major camera / NVR brands (RTSP, 700-800)
pub const VENDOR_RTSP_PATHS: &[VendorPath] = &[
    vp("Hikvision", 554, "/Streaming/Channels/101", 800),
    vp("Hikvision", 554, "/Streaming/Channels/102", 760),
    vp("Hikvision", 554, "/ISAPI/Streaming/channels/101", 740),
    vp("Dahua", 554, "/cam/realmonitor?channel=1&subtype=0", 795),
    vp("Dahua", 554, "/cam/realmonitor?channel=1&subtype=1", 755),
    vp("TP-Link Tapo", 554, "/stream1", 790),
    vp("TP-Link Tapo", 554, "/stream2", 750),
    vp("Reolink", 554, "/h264Preview_01_main", 785),
    vp("Reolink", 554, "/h264Preview_01_sub", 745),
    vp("Reolink", 554, "/Preview_01_main", 735),
    vp("Axis", 554, "/axis-media/media.amp", 780),
    vp("Axis", 554, "/axis-media/media.amp?videocodec=h264", 742),
    vp("Uniview", 554, "/unicast/c1/s0/live", 775),
    vp("Uniview", 554, "/media/video1", 738),
    vp("Amcrest", 554, "/cam/realmonitor?channel=1&subtype=0&unicast=true&proto=Onvif", 770),
    vp("Foscam", 88, "/videoMain", 765),
    vp("Foscam", 554, "/videoMain", 736),
    vp("Hanwha", 554, "/profile2/media.smp", 760),
    vp("Hanwha", 558, "/profile2/media.smp", 730),
    vp("Vivotek", 554, "/live.sdp", 755),
    vp("Ubiquiti", 7447, "/live", 750),
    vp("Bosch", 554, "/?inst=1", 745),
    vp("Sony", 554, "/media/video1", 733),
    vp("Panasonic", 554, "/MediaInput/h264", 740),
    vp("Xiaomi", 554, "/live/ch00_0", 735),
    vp("Imou", 554, "/cam/realmonitor?channel=1&subtype=0", 720),
    vp("Ezviz", 554, "/h264/ch1/main/av_stream", 730),
    vp("Wyze", 8554, "/live", 725),
    vp("Tenda", 554, "/ch0_0.h264", 720),
    vp("Annke", 554, "/Streaming/Channels/1", 715),
    vp("Milesight", 554, "/main", 710),
    vp("Grandstream", 554, "/0", 705),
    vp("D-Link", 554, "/live1.sdp", 705),
    vp("Trendnet", 554, "/play1.sdp", 700),
];

/// Lesser-known DVR / white-label firmwares (RTSP, 520-560)
pub const DVR_RTSP_PATHS: &[VendorPath] = &[
    vp("Xiongmai", 554, "/user={user}_password={pass}_channel=1_stream=0.sdp", 560),
    vp("Xiongmai", 554, "/user={user}&password={pass}&channel=1&stream=0.sdp", 555),
    vp("HiSilicon DVR", 554, "/11", 550),
    vp("HiSilicon DVR", 554, "/12", 540),
    vp("Generic DVR", 554, "/cam1/mpeg4", 545),
    vp("Generic DVR", 554, "/cam1/h264", 545),
    vp("Generic DVR", 554, "/mpeg4", 535),
    vp("Generic DVR", 554, "/live/ch0", 535),
    vp("Generic DVR", 554, "/ch01.264", 530),
    vp("Generic DVR", 554, "/av0_0", 530),
    vp("Generic DVR", 554, "/live.sdp", 525),
    vp("Generic DVR", 554, "/Streaming/Unicast/channels/101", 525),
    vp("Generic DVR", 554, "/h264/ch01/main/av_stream", 520),
    vp("Generic DVR", 554, "/VideoInput/1/h264/1", 520),
];

/// Common paths tried on the standard RTSP ports (with and without credentials)
pub const GENERIC_RTSP_PATHS: &[&str] = &[
    "/",
    "/live",
    "/live/main",
    "/live/ch0",
    "/stream",
    "/stream1",
    "/h264",
    "/h264_stream",
    "/video1",
    "/media",
    "/1",
    "/ch0_0.h264",
];

/// Ports tried with `GENERIC_RTSP_PATHS`, in priority order
pub const GENERIC_RTSP_PORTS: &[u16] = &[554, 8554];

/// HTTP MJPEG / snapshot endpoints (400 band)
pub const HTTP_PATHS: &[VendorPath] = &[
    vp("Axis", 80, "/mjpg/video.mjpg", 420),
    vp("Axis", 80, "/axis-cgi/mjpg/video.cgi", 418),
    vp("Dahua", 80, "/cgi-bin/mjpg/video.cgi?channel=1&subtype=1", 415),
    vp("Hikvision", 80, "/ISAPI/Streaming/channels/102/httppreview", 412),
    vp("Foscam", 88, "/cgi-bin/CGIStream.cgi?cmd=GetMJStream&usr={user}&pwd={pass}", 410),
    vp("Generic", 80, "/video.mjpg", 405),
    vp("Generic", 80, "/videostream.cgi", 402),
    vp("Generic", 8080, "/video", 400),
    vp("Generic", 80, "/snapshot.jpg", 390),
    vp("Dahua", 80, "/cgi-bin/snapshot.cgi", 388),
    vp("Hikvision", 80, "/ISAPI/Streaming/channels/101/picture", 386),
    vp("Generic", 80, "/image.jpg", 380),
];

/// RTMP endpoints (200 band)
pub const RTMP_PATHS: &[VendorPath] = &[
    vp(
        "Reolink",
        1935,
        "/bcs/channel0_main.bcs?channel=0&stream=0&user={user}&password={pass}",
        210,
    ),
    vp("Generic", 1935, "/live/stream", 200),
    vp("Generic", 1935, "/live", 195),
];

/// Curated short list for quick scans, tried in order
pub const QUICK_SCAN_PATHS: &[(u16, &str)] = &[
    (554, "/Streaming/Channels/101"),
    (554, "/cam/realmonitor?channel=1&subtype=0"),
    (554, "/stream1"),
    (554, "/h264Preview_01_main"),
    (554, "/live/main"),
    (554, "/live"),
    (554, "/ch0_0.h264"),
    (554, "/11"),
    (554, "/"),
];

/// Substitute `{user}` / `{pass}` placeholders
pub fn fill_credentials(path: &str, user: &str, pass: &str) -> String {
    path.replace("{user}", user).replace("{pass}", pass)
}
