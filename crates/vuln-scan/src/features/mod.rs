pub mod scan_image;
