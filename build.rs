fn main() {
    // Embed Windows resources (version info, elevation-friendly manifest metadata)
    #[cfg(windows)]
    {
        let mut res = winres::WindowsResource::new();
        res.set("ProductName", "HandsOff");
        res.set("FileDescription", "One-click touchscreen toggle");
        res.set("CompanyName", "HandsOff Contributors");
        res.set("LegalCopyright", "Copyright © 2014 HandsOff Contributors");
        res.set("OriginalFilename", "handsoff.exe");
        res.set("FileVersion", env!("CARGO_PKG_VERSION"));
        res.set("ProductVersion", env!("CARGO_PKG_VERSION"));
        if let Err(e) = res.compile() {
            println!("cargo:warning=Failed to embed Windows resources: {e}");
        }
    }
}
