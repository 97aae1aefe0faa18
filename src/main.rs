fn main() {
    if let Err(e) = snap_qr_lib::run() {
        log::error!("Snap QR failed: {}", e);
        eprintln!("snap-qr: {e}");
        std::process::exit(1);
    }
}
