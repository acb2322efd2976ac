/*!
 * Tests for the message file codecs
 */

use msgtrans::errors::FileError;
use msgtrans::job::{FileCodec, MsgArrCodec, PlainLinesCodec};

const LANGUAGE_FILE: &str = r#"<?php
// Language: English
$msg_arr['btn_save'] = 'Save';
$msg_arr['greeting'] = 'Hello {name}, welcome back';
   $msg_arr["title"] = "Messages";
$msg_arr['multi'] = 'not
closed on the same line';
$msg_arr['empty'] = '';
?>
"#;

#[test]
fn test_extract_shouldSkipNonMatchingLines() {
    let strings = MsgArrCodec.extract(LANGUAGE_FILE.as_bytes()).unwrap();

    assert_eq!(
        strings,
        vec!["Save", "Hello {name}, welcome back", "Messages", ""]
    );
}

#[test]
fn test_rewrite_withSameStrings_shouldReproduceFile() {
    let strings = MsgArrCodec.extract(LANGUAGE_FILE.as_bytes()).unwrap();

    let output = MsgArrCodec.rewrite(LANGUAGE_FILE.as_bytes(), &strings).unwrap();

    assert_eq!(String::from_utf8(output).unwrap(), LANGUAGE_FILE);
}

#[test]
fn test_rewrite_shouldKeepIndentationAndKeys() {
    let translated: Vec<String> = ["Salvar", "Olá {name}, bem-vindo", "Mensagens", ""]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let output = String::from_utf8(MsgArrCodec.rewrite(LANGUAGE_FILE.as_bytes(), &translated).unwrap()).unwrap();

    assert!(output.contains("$msg_arr['btn_save'] = 'Salvar';\n"));
    assert!(output.contains("   $msg_arr[\"title\"] = \"Mensagens\";\n"));
    assert!(output.contains("// Language: English\n"));
    assert!(output.ends_with("?>\n"));
}

#[test]
fn test_rewrite_withTooManyStrings_shouldFail() {
    let strings: Vec<String> = (0..5).map(|i| i.to_string()).collect();

    let result = MsgArrCodec.rewrite(LANGUAGE_FILE.as_bytes(), &strings);

    assert!(matches!(
        result,
        Err(FileError::StringCountMismatch { expected: 4, actual: 5 })
    ));
}

#[test]
fn test_rewrite_withQuoteInTranslation_shouldEscapeIt() {
    let file = "$msg_arr['a'] = 'Don\\'t';\n";
    assert_eq!(MsgArrCodec.extract(file.as_bytes()).unwrap(), vec!["Don't"]);

    let output = MsgArrCodec.rewrite(file.as_bytes(), &["N'importe".to_string()]).unwrap();

    assert_eq!(String::from_utf8(output).unwrap(), "$msg_arr['a'] = 'N\\'importe';\n");
}

#[test]
fn test_plainLines_withCrlf_shouldPreserveLineEndings() {
    let file = "One\r\n\r\nTwo\r\n";

    let output = PlainLinesCodec
        .rewrite(file.as_bytes(), &["Um".to_string(), "Dois".to_string()])
        .unwrap();

    assert_eq!(String::from_utf8(output).unwrap(), "Um\r\n\r\nDois\r\n");
}

#[test]
fn test_plainLines_withWrongCount_shouldFail() {
    assert!(PlainLinesCodec.rewrite(b"One\nTwo\n", &["Um".to_string()]).is_err());
}
