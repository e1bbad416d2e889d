//! Binary fixtures for upload tests

use std::io::Cursor;
use std::path::Path;

use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};

fn ascii(tag: Tag, value: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![value.as_bytes().to_vec()]),
    }
}

/// A TIFF container whose primary IFD holds exactly Make, Model and Software.
pub fn tagged_tiff() -> Vec<u8> {
    let fields = [
        ascii(Tag::Make, "Acme"),
        ascii(Tag::Model, "Roadrunner 3000"),
        ascii(Tag::Software, "mediagate-tests"),
    ];
    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut buf = Cursor::new(Vec::new());
    writer
        .write(&mut buf, false)
        .expect("Failed to write TIFF fixture");
    buf.into_inner()
}

/// Write an executable `ffmpeg` stand-in running `body` under `/bin/sh`.
#[cfg(unix)]
pub fn fake_ffmpeg(dir: &Path, body: &str) -> String {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("ffmpeg");
    let mut script = std::fs::File::create(&path).expect("Failed to create script");
    writeln!(script, "#!/bin/sh\n{}", body).expect("Failed to write script");
    script.sync_all().expect("Failed to sync script");
    drop(script);
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to chmod script");
    path.to_string_lossy().into_owned()
}

/// Emits a fixed ffmetadata document, or `PNG` bytes for thumbnail calls.
pub const FFMPEG_SUCCESS: &str = r#"
case "$*" in
  *ffmetadata*) printf ';FFMETADATA1\ntitle=Harbour at dawn\nencoder=Lavf60.3.100\n' ;;
  *image2pipe*) printf 'PNG' ;;
  *) exit 2 ;;
esac
"#;

pub const FFMPEG_FAILURE: &str = r#"
echo "moov atom not found" >&2
exit 1
"#;
