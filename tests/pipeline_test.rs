mod common;

use anyhow::Result;
use autoshorts::shorts::error::ShortsError;
use autoshorts::shorts::pipeline::{JobRequest, JobSource, Stage};
use bytes::Bytes;
use common::{HarnessOptions, NARRATION, PNG, harness};

fn url_request() -> JobRequest {
    JobRequest {
        source: JobSource::Url("https://news.example/ai-plan".to_string()),
        title: "AI 육성 계획".to_string(),
        images: Vec::new(),
    }
}

fn count_flag(args: &[String], flag: &str) -> usize {
    args.iter().filter(|arg| *arg == flag).count()
}

#[tokio::test]
async fn article_job_walks_every_stage_in_order() -> Result<()> {
    let h = harness(HarnessOptions::default())?;
    let mut stages = Vec::new();

    let output = h
        .pipeline
        .run_observed(url_request(), &mut |stage| stages.push(stage))
        .await?;

    assert_eq!(
        stages,
        vec![
            Stage::Extracting,
            Stage::Summarizing,
            Stage::Synthesizing,
            Stage::Transcribing,
            Stage::AssemblingSlides,
            Stage::AssemblingCaptions,
            Stage::BuildingGraph,
            Stage::Rendering,
            Stage::Done,
        ]
    );
    assert!(output.job_id.starts_with("job_"));
    assert_eq!(output.title, "AI 육성 계획");
    assert_eq!(output.script, NARRATION);
    assert!(output.captions.contains("00:00:03,500 --> 00:00:09,000"));
    assert!(output.video.starts_with(b"\0\0\0\x18ftyp"));
    assert_eq!(h.writer.calls(), 1);
    assert_eq!(h.env.leftover_workspaces(), 0);
    Ok(())
}

#[tokio::test]
async fn search_fills_all_slides_when_no_images_are_uploaded() -> Result<()> {
    let h = harness(HarnessOptions::default())?;
    h.pipeline.run(url_request()).await?;

    let requests = h.images.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].1, 6);

    let commands = h.engine.commands.lock().unwrap();
    let args = &commands[0];
    // Six stills plus the narration.
    assert_eq!(count_flag(args, "-i"), 7);
    assert_eq!(count_flag(args, "-loop"), 6);
    // 9 seconds of transcript over six slides.
    assert_eq!(count_flag(args, "1.500"), 6);
    Ok(())
}

#[tokio::test]
async fn uploaded_images_come_first_and_search_tops_up() -> Result<()> {
    let h = harness(HarnessOptions::default())?;
    let request = JobRequest {
        images: vec![Bytes::from_static(b"\xff\xd8\xffuser-0"), Bytes::from_static(PNG)],
        ..url_request()
    };
    h.pipeline.run(request).await?;

    let requests = h.images.requests.lock().unwrap().clone();
    assert_eq!(requests[0].1, 4);

    let commands = h.engine.commands.lock().unwrap();
    let inputs: Vec<&String> = commands[0]
        .windows(2)
        .filter(|pair| pair[0] == "-i")
        .map(|pair| &pair[1])
        .collect();
    assert!(inputs[0].ends_with("slide_0.jpg"));
    assert!(inputs[1].ends_with("slide_1.png"));
    assert!(inputs[6].ends_with("narration.mp3"));
    Ok(())
}

#[tokio::test]
async fn direct_script_is_used_verbatim() -> Result<()> {
    let h = harness(HarnessOptions::default())?;
    let request = JobRequest {
        source: JobSource::Script("  직접 작성한 대본입니다.\n".to_string()),
        title: "대본".to_string(),
        images: vec![Bytes::from_static(PNG); 6],
    };

    let output = h.pipeline.run(request).await?;

    assert_eq!(output.script, "직접 작성한 대본입니다.");
    assert_eq!(h.writer.calls(), 0);
    assert!(h.images.requests.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn speech_failure_is_tagged_with_its_stage() -> Result<()> {
    let h = harness(HarnessOptions {
        speech_fails: true,
        ..HarnessOptions::default()
    })?;
    let mut stages = Vec::new();

    let failure = h
        .pipeline
        .run_observed(url_request(), &mut |stage| stages.push(stage))
        .await
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Synthesizing);
    assert!(matches!(failure.error, ShortsError::SpeechSynthesisFailed(_)));
    assert_eq!(stages.last(), Some(&Stage::Failed));
    assert!(!stages.contains(&Stage::Rendering));
    assert!(h.engine.commands.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn unreachable_article_fails_extraction() -> Result<()> {
    let h = harness(HarnessOptions::default())?;
    let request = JobRequest {
        source: JobSource::Url("https://news.example/missing".to_string()),
        ..url_request()
    };

    let failure = h.pipeline.run(request).await.unwrap_err();

    assert_eq!(failure.stage, Stage::Extracting);
    assert!(matches!(failure.error, ShortsError::ExtractionFailed(_)));
    assert_eq!(h.writer.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn engine_failure_cleans_up_the_workspace() -> Result<()> {
    let h = harness(HarnessOptions {
        engine_fails: true,
        ..HarnessOptions::default()
    })?;

    let failure = h.pipeline.run(url_request()).await.unwrap_err();

    assert_eq!(failure.stage, Stage::Rendering);
    assert!(matches!(
        failure.error,
        ShortsError::RenderEngineFailed { status: Some(1), .. }
    ));
    assert_eq!(h.engine.commands.lock().unwrap().len(), 1);
    assert_eq!(h.env.leftover_workspaces(), 0);
    Ok(())
}

#[tokio::test]
async fn invalid_request_never_starts() -> Result<()> {
    let h = harness(HarnessOptions::default())?;
    let request = JobRequest {
        title: String::new(),
        ..url_request()
    };

    let failure = h.pipeline.run(request).await.unwrap_err();

    assert_eq!(failure.stage, Stage::Idle);
    assert!(matches!(failure.error, ShortsError::InvalidRequest(_)));
    assert_eq!(h.writer.calls(), 0);
    Ok(())
}
