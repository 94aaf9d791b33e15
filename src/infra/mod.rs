pub mod csv_codec;
pub mod csv_file_sink;
pub mod http_client;
