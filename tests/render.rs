//! Tests for the page renderers, chapter tasks and the archiver.

use comicpress::archive::{archive_folder, archive_members};
use comicpress::chapter::ChapterTask;
use comicpress::error::{Error, Result};
use comicpress::generator::{Generator, LongImageGenerator, PdfGenerator, RenderSettings};
use comicpress::prelude::*;
use comicpress::types::{ArtifactStatus, Chapter, ChapterOutcome};
use image::Rgb;

mod common;
use common::{
    create_corrupt_page, create_dummy_page, create_page, pdf_page_count, setup_test_dirs,
    zip_entry_names,
};

#[tokio::test]
async fn test_pdf_skips_unreadable_pages() -> Result<()> {
    let dirs = setup_test_dirs("pdf_skip").await;
    let chapter = dirs.input_dir.join("ch1");
    create_dummy_page(&chapter.join("p1.jpg")).await?;
    create_corrupt_page(&chapter.join("p2.jpg")).await?;
    create_page(&chapter.join("p3.png"), 80, 120, Rgb([0, 0, 255])).await?;
    tokio::fs::create_dir_all(&dirs.output_dir).await?;

    let pages = Collector::list_pages(&chapter).await?;
    let output = dirs.output_dir.join("ch1.pdf");
    let report = PdfGenerator::new(RenderSettings::default()).render(&pages, &output)?;

    assert!(report.written);
    assert_eq!(report.pages_rendered, 2);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(pdf_page_count(&output), 2);
    assert!(!dirs.output_dir.join("ch1.pdf.part").exists());
    Ok(())
}

#[tokio::test]
async fn test_pdf_with_no_readable_pages_is_not_written() -> Result<()> {
    let dirs = setup_test_dirs("pdf_none").await;
    let chapter = dirs.input_dir.join("ch1");
    create_corrupt_page(&chapter.join("p1.jpg")).await?;
    create_corrupt_page(&chapter.join("p2.png")).await?;
    tokio::fs::create_dir_all(&dirs.output_dir).await?;

    let pages = Collector::list_pages(&chapter).await?;
    let output = dirs.output_dir.join("ch1.pdf");
    let settings = RenderSettings {
        image_quality: 60,
        optimize: true,
    };
    let report = PdfGenerator::new(settings).render(&pages, &output)?;

    assert!(!report.written);
    assert_eq!(report.pages_rendered, 0);
    assert!(!output.exists());
    Ok(())
}

#[tokio::test]
async fn test_long_image_scales_to_widest_page() -> Result<()> {
    let dirs = setup_test_dirs("long_image").await;
    let chapter = dirs.input_dir.join("ch1");
    create_page(&chapter.join("p1.png"), 100, 50, Rgb([255, 0, 0])).await?;
    create_page(&chapter.join("p2.png"), 200, 100, Rgb([0, 255, 0])).await?;
    create_page(&chapter.join("p3.jpg"), 50, 100, Rgb([0, 0, 255])).await?;
    tokio::fs::create_dir_all(&dirs.output_dir).await?;

    let pages = Collector::list_pages(&chapter).await?;
    let output = dirs.output_dir.join("ch1_long.png");
    let report = LongImageGenerator::new(RenderSettings::default()).render(&pages, &output)?;

    assert!(report.written);
    assert_eq!(report.pages_rendered, 3);
    // 100 (100x50 at width 200) + 100 + 400 (50x100 at width 200)
    assert_eq!(image::image_dimensions(&output)?, (200, 600));

    let strip = image::open(&output)?.into_rgb8();
    let scaled = strip.get_pixel(100, 50);
    assert!(scaled[0] > 200 && scaled[1] < 50, "unexpected pixel {:?}", scaled);
    assert_eq!(strip.get_pixel(100, 150), &Rgb([0, 255, 0]));
    Ok(())
}

#[tokio::test]
async fn test_long_image_ignores_unreadable_pages() -> Result<()> {
    let dirs = setup_test_dirs("long_image_skip").await;
    let chapter = dirs.input_dir.join("ch1");
    create_corrupt_page(&chapter.join("p1.png")).await?;
    create_page(&chapter.join("p2.png"), 60, 40, Rgb([10, 10, 10])).await?;
    tokio::fs::create_dir_all(&dirs.output_dir).await?;

    let pages = Collector::list_pages(&chapter).await?;
    let output = dirs.output_dir.join("ch1_long.png");
    let settings = RenderSettings {
        image_quality: 100,
        optimize: true,
    };
    let report = LongImageGenerator::new(settings).render(&pages, &output)?;

    assert_eq!(report.pages_rendered, 1);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(image::image_dimensions(&output)?, (60, 40));
    Ok(())
}

#[tokio::test]
async fn test_chapter_task_keeps_existing_artifacts() -> Result<()> {
    let dirs = setup_test_dirs("existing_artifact").await;
    let folder = dirs.input_dir.join("ch1");
    create_dummy_page(&folder.join("p1.jpg")).await?;
    let pdf_folder = dirs.output_dir.join("comicA_pdf");
    let long_folder = dirs.output_dir.join("comicA_long");
    tokio::fs::create_dir_all(&pdf_folder).await?;
    tokio::fs::create_dir_all(&long_folder).await?;
    tokio::fs::write(pdf_folder.join("ch1.pdf"), b"placeholder").await?;

    let chapter = Chapter {
        name: "ch1".to_string(),
        pages: Collector::list_pages(&folder).await?,
        folder,
    };
    let folders = vec![
        (ArtifactKind::Pdf, pdf_folder.clone()),
        (ArtifactKind::LongImage, long_folder.clone()),
    ];
    assert!(ChapterTask::has_pending_work(&chapter, &folders));

    let task = ChapterTask::new(
        chapter.clone(),
        Some(pdf_folder.clone()),
        Some(long_folder.clone()),
        RenderSettings::default(),
    );
    let report = tokio::task::spawn_blocking(move || task.run()).await?;

    assert_eq!(
        report.outcome,
        ChapterOutcome::Rendered {
            pdf: ArtifactStatus::AlreadyExists,
            long_image: ArtifactStatus::Written(1),
        }
    );
    assert_eq!(tokio::fs::read(pdf_folder.join("ch1.pdf")).await?, b"placeholder");
    assert!(long_folder.join("ch1_long.png").exists());
    assert!(!ChapterTask::has_pending_work(&chapter, &folders));
    Ok(())
}

#[tokio::test]
async fn test_archive_stores_folder_contents() -> Result<()> {
    let dirs = setup_test_dirs("archive").await;
    let folder = dirs.output_dir.join("comicA_pdf");
    tokio::fs::create_dir_all(&folder).await?;
    tokio::fs::write(folder.join("ch2.pdf"), b"two").await?;
    tokio::fs::write(folder.join("ch1.pdf"), b"one").await?;
    tokio::fs::write(folder.join("ch3.pdf.part"), b"partial").await?;

    assert_eq!(archive_members(&folder)?.len(), 2);

    let zip_path = archive_folder(&folder, "comicA_pdf")?;
    assert_eq!(zip_path, dirs.output_dir.join("comicA_pdf.zip"));
    assert_eq!(zip_entry_names(&zip_path), vec!["ch1.pdf", "ch2.pdf"]);

    // the source folder is kept
    assert!(folder.join("ch1.pdf").exists());
    assert!(folder.join("ch2.pdf").exists());
    Ok(())
}

fn single_page_chapter(folder: &Path, pages: Vec<PathBuf>) -> Chapter {
    Chapter {
        name: "ch1".to_string(),
        folder: folder.to_path_buf(),
        pages,
    }
}

#[tokio::test]
async fn test_pdf_write_failure_still_renders_long_image() -> Result<()> {
    let dirs = setup_test_dirs("pdf_write_failure").await;
    let folder = dirs.input_dir.join("ch1");
    create_dummy_page(&folder.join("p1.jpg")).await?;
    let pdf_folder = dirs.output_dir.join("comicA_pdf");
    let long_folder = dirs.output_dir.join("comicA_long");
    // a directory in place of the partial file makes the PDF write fail
    tokio::fs::create_dir_all(pdf_folder.join("ch1.pdf.part")).await?;
    tokio::fs::create_dir_all(&long_folder).await?;

    let chapter = single_page_chapter(&folder, Collector::list_pages(&folder).await?);
    let task = ChapterTask::new(
        chapter,
        Some(pdf_folder.clone()),
        Some(long_folder.clone()),
        RenderSettings::default(),
    );
    let report = tokio::task::spawn_blocking(move || task.run()).await?;

    match &report.outcome {
        ChapterOutcome::Rendered { pdf, long_image } => {
            assert!(pdf.is_failed(), "unexpected PDF status {:?}", pdf);
            assert_eq!(long_image, &ArtifactStatus::Written(1));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(report.is_failure());
    assert!(report.message().contains("PDF failed"));
    assert!(!pdf_folder.join("ch1.pdf").exists());
    assert!(long_folder.join("ch1_long.png").exists());
    Ok(())
}

#[tokio::test]
async fn test_chapter_fails_when_every_artifact_fails() -> Result<()> {
    let dirs = setup_test_dirs("all_writes_fail").await;
    let folder = dirs.input_dir.join("ch1");
    create_dummy_page(&folder.join("p1.jpg")).await?;
    let pdf_folder = dirs.output_dir.join("comicA_pdf");
    let long_folder = dirs.output_dir.join("comicA_long");
    tokio::fs::create_dir_all(pdf_folder.join("ch1.pdf.part")).await?;
    tokio::fs::create_dir_all(long_folder.join("ch1_long.png.part")).await?;

    let chapter = single_page_chapter(&folder, Collector::list_pages(&folder).await?);
    let task = ChapterTask::new(
        chapter,
        Some(pdf_folder),
        Some(long_folder),
        RenderSettings::default(),
    );
    let report = tokio::task::spawn_blocking(move || task.run()).await?;

    assert!(matches!(report.outcome, ChapterOutcome::Failed(_)));
    assert!(report.message().contains("failed:"));
    Ok(())
}

#[tokio::test]
async fn test_failed_archive_keeps_previous_zip() -> Result<()> {
    let dirs = setup_test_dirs("archive_failure").await;
    let folder = dirs.output_dir.join("comicA_pdf");
    tokio::fs::create_dir_all(&folder).await?;
    tokio::fs::write(folder.join("ch1.pdf"), b"one").await?;
    let zip_path = dirs.output_dir.join("comicA_pdf.zip");
    tokio::fs::write(&zip_path, b"previous").await?;
    tokio::fs::create_dir_all(dirs.output_dir.join("comicA_pdf.zip.part")).await?;

    let result = archive_folder(&folder, "comicA_pdf");

    assert!(matches!(result, Err(Error::Archive { .. })));
    assert_eq!(tokio::fs::read(&zip_path).await?, b"previous");
    Ok(())
}

#[tokio::test]
async fn test_archive_leaves_no_partial_file() -> Result<()> {
    let dirs = setup_test_dirs("archive_partial").await;
    let folder = dirs.output_dir.join("comicA_long");
    tokio::fs::create_dir_all(&folder).await?;
    tokio::fs::write(folder.join("ch1_long.png"), b"strip").await?;

    let zip_path = archive_folder(&folder, "comicA_long")?;

    assert_eq!(zip_entry_names(&zip_path), vec!["ch1_long.png"]);
    assert!(!dirs.output_dir.join("comicA_long.zip.part").exists());
    Ok(())
}
